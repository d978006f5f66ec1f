//! Structured logging setup with tracing

use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "photo_widget.log";

/// Flushes the file writer when dropped
pub struct LogGuard {
    _file: WorkerGuard,
}

/// Initialize the logging system, writing rolled JSON logs under `log_dir`
pub fn init_logging(log_dir: &Path) -> anyhow::Result<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_writer(non_blocking));

    #[cfg(debug_assertions)]
    let registry = registry.with(fmt::layer().pretty().with_writer(std::io::stderr));

    registry.try_init()?;

    tracing::info!("Logging initialized in {:?}", log_dir);
    Ok(LogGuard { _file: guard })
}

/// Delete rolled log files in `log_dir` older than `days`
pub fn cleanup_old_logs(log_dir: &Path, days: u32) -> anyhow::Result<usize> {
    if !log_dir.exists() {
        return Ok(0);
    }

    let threshold = SystemTime::now() - Duration::from_secs(days as u64 * 24 * 60 * 60);
    let mut deleted = 0;

    for entry in std::fs::read_dir(log_dir)? {
        let path = entry?.path();

        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.starts_with(LOG_FILE_PREFIX));
        if !is_log {
            continue;
        }

        let modified = std::fs::metadata(&path).and_then(|m| m.modified());
        if matches!(modified, Ok(t) if t < threshold) && std::fs::remove_file(&path).is_ok() {
            deleted += 1;
            tracing::debug!("Deleted old log: {:?}", path);
        }
    }

    tracing::info!("Cleaned up {} old log files", deleted);
    Ok(deleted)
}

//! PhotoWidget - folder gallery widget core
//!
//! Headless host: drives widget instances from the command line.

mod app;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = app::Cli::parse();

    // Initialize logging and panic hook first
    let _log_guard = app_log::init()?;

    tracing::info!("PhotoWidget starting...");

    // Load configuration
    let config = app_core::AppConfig::load().unwrap_or_else(|e| {
        tracing::warn!("Failed to load configuration: {}", e);
        app_core::AppConfig::default()
    });

    if let Err(e) = app_log::cleanup_old_logs(&app_log::log_dir(), config.logging.retention_days) {
        tracing::warn!("Failed to cleanup old logs: {}", e);
    }

    app::run(cli, config).await
}

//! PhotoWidget Database Layer
//!
//! Provides the per-instance configuration store: one folder reference per
//! widget instance, kept in a small SQLite key-value table.

mod schema;
mod pool;
mod prefs;

pub use prefs::{folder_key, InstanceId, WidgetPrefs};
pub use pool::{init_pool, DbPool};
pub use schema::migrate;

use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use thiserror::Error;

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Pool error: {0}")]
    Pool(String),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("Corrupt value for {key}: {reason}")]
    CorruptValue { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Get the database directory
pub fn db_dir() -> PathBuf {
    ProjectDirs::from("com", "PhotoWidget", "PhotoWidget")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("./data"))
}

/// Default location of the preferences database
pub fn default_db_path() -> PathBuf {
    db_dir().join("widget_prefs.db")
}

/// Open (creating and migrating if needed) the configuration store
pub fn init(path: &Path) -> Result<WidgetPrefs> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let pool = init_pool(path)?;
    migrate(&pool)?;

    tracing::info!("Configuration store initialized at {:?}", path);
    Ok(WidgetPrefs::new(pool))
}

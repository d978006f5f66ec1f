//! SQLite connection pool for the widget preference store

use crate::{DbError, Result};
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use std::time::Duration;

pub type DbPool = Pool<SqliteConnectionManager>;

/// Every store operation is a single-key statement, so a handful of
/// connections covers the coordinator plus one reload per busy instance.
const MAX_CONNECTIONS: u32 = 4;

/// Milliseconds a writer waits on a locked database before failing
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Open a pool over the store at `path`
pub fn init_pool(path: &Path) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(path).with_init(|conn| {
        // WAL: provider reloads read while the coordinator writes
        conn.execute_batch("PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;")?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        Ok(())
    });

    Pool::builder()
        .max_size(MAX_CONNECTIONS)
        .min_idle(Some(1))
        .connection_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))
        .build(manager)
        .map_err(|e| DbError::Pool(e.to_string()))
}

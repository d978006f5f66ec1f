//! Per-instance folder preferences

use crate::{DbError, DbPool, Result};
use app_fs::FolderReference;
use rusqlite::OptionalExtension;
use serde::{Deserialize, Serialize};
use std::fmt;

const KEY_PREFIX: &str = "folder_uri_";

/// Widget instance id, assigned by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(pub i32);

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for InstanceId {
    fn from(id: i32) -> Self {
        Self(id)
    }
}

/// Store key for an instance's folder reference
pub fn folder_key(id: InstanceId) -> String {
    format!("{}{}", KEY_PREFIX, id.0)
}

/// Configuration store: at most one folder reference per instance.
///
/// Every operation is a single SQLite statement, so a concurrent `set` and
/// `get` on the same key never observe a partially written value.
#[derive(Clone)]
pub struct WidgetPrefs {
    pool: DbPool,
}

impl WidgetPrefs {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Store (or with `None`, clear) the folder for an instance
    pub fn set(&self, id: InstanceId, folder: Option<&FolderReference>) -> Result<()> {
        let Some(folder) = folder else {
            return self.remove(id);
        };

        let conn = self.pool.get().map_err(|e| DbError::Pool(e.to_string()))?;
        conn.execute(
            r#"
            INSERT INTO widget_prefs (key, value) VALUES (?1, ?2)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = strftime('%s', 'now')
            "#,
            rusqlite::params![folder_key(id), folder.as_str()],
        )?;

        tracing::debug!("Stored folder {} for instance {}", folder, id);
        Ok(())
    }

    /// Folder for an instance; an unreadable store counts as unconfigured
    pub fn get(&self, id: InstanceId) -> Option<FolderReference> {
        match self.try_get(id) {
            Ok(folder) => folder,
            Err(e) => {
                tracing::warn!("Configuration for instance {} unavailable: {}", id, e);
                None
            }
        }
    }

    /// Folder for an instance, reporting store failures
    pub fn try_get(&self, id: InstanceId) -> Result<Option<FolderReference>> {
        let key = folder_key(id);
        let conn = self.pool.get().map_err(|e| DbError::Pool(e.to_string()))?;

        let stored: Option<String> = conn
            .query_row(
                "SELECT value FROM widget_prefs WHERE key = ?1",
                [&key],
                |row| row.get(0),
            )
            .optional()?;

        stored
            .map(|token| {
                FolderReference::parse(token).map_err(|e| DbError::CorruptValue {
                    key: key.clone(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Forget the folder for an instance
    pub fn remove(&self, id: InstanceId) -> Result<()> {
        let conn = self.pool.get().map_err(|e| DbError::Pool(e.to_string()))?;
        let rows = conn.execute("DELETE FROM widget_prefs WHERE key = ?1", [folder_key(id)])?;

        if rows > 0 {
            tracing::debug!("Cleared folder for instance {}", id);
        }
        Ok(())
    }

    /// Every instance that currently has a folder configured, ascending
    pub fn instance_ids(&self) -> Result<Vec<InstanceId>> {
        let conn = self.pool.get().map_err(|e| DbError::Pool(e.to_string()))?;

        let mut stmt = conn.prepare("SELECT key FROM widget_prefs WHERE key LIKE ?1")?;
        let rows = stmt.query_map([format!("{}%", KEY_PREFIX)], |row| row.get::<_, String>(0))?;

        let mut ids = Vec::new();
        for row in rows {
            let key = row?;
            if let Some(id) = key.strip_prefix(KEY_PREFIX).and_then(|s| s.parse().ok()) {
                ids.push(InstanceId(id));
            }
        }
        ids.sort();

        Ok(ids)
    }
}

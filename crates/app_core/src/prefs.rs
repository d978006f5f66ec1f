//! Async facade over the configuration store

use crate::AppError;
use app_db::{InstanceId, WidgetPrefs};
use app_fs::FolderReference;
use std::sync::Arc;

/// Runs store operations on the blocking pool so async callers never stall
#[derive(Clone)]
pub struct AsyncWidgetPrefs {
    inner: Arc<WidgetPrefs>,
}

impl AsyncWidgetPrefs {
    pub fn new(inner: Arc<WidgetPrefs>) -> Self {
        Self { inner }
    }

    pub fn blocking(&self) -> &Arc<WidgetPrefs> {
        &self.inner
    }

    pub async fn set(&self, id: InstanceId, folder: Option<FolderReference>) -> Result<(), AppError> {
        let prefs = self.inner.clone();
        tokio::task::spawn_blocking(move || prefs.set(id, folder.as_ref()))
            .await
            .map_err(|e| AppError::ConfigUnavailable(e.to_string()))?
            .map_err(AppError::from)
    }

    /// Unset, unreadable and unreachable all read as `None`
    pub async fn get(&self, id: InstanceId) -> Option<FolderReference> {
        let prefs = self.inner.clone();
        match tokio::task::spawn_blocking(move || prefs.get(id)).await {
            Ok(folder) => folder,
            Err(e) => {
                tracing::warn!("Configuration read for instance {} failed: {}", id, e);
                None
            }
        }
    }

    pub async fn remove(&self, id: InstanceId) -> Result<(), AppError> {
        self.set(id, None).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_round_trip() {
        let db = NamedTempFile::new().unwrap();
        let prefs = AsyncWidgetPrefs::new(Arc::new(app_db::init(db.path()).unwrap()));
        let folder = FolderReference::parse("mem://a").unwrap();

        prefs.set(InstanceId(7), Some(folder.clone())).await.unwrap();
        assert_eq!(prefs.get(InstanceId(7)).await, Some(folder));

        prefs.remove(InstanceId(7)).await.unwrap();
        assert_eq!(prefs.get(InstanceId(7)).await, None);
    }
}

//! Contracts between the core and the hosting display surface

use crate::{AppError, DecodedImage};
use app_db::InstanceId;
use app_fs::FolderReference;

/// What the host renders for one list position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderItem {
    Image(DecodedImage),
    /// Shown when an entry could not be decoded
    Placeholder,
}

/// Calls the core issues back to the host surface
pub trait WidgetHost: Send + Sync {
    /// Every instance id the host currently knows about
    fn instance_ids(&self) -> Vec<InstanceId>;

    /// Re-render an instance now
    fn rerender(&self, id: InstanceId);

    /// The list data behind an instance changed; the host reloads its provider
    fn notify_data_changed(&self, id: InstanceId);
}

/// Persistent read grants for user-chosen folders
pub trait AccessGrants: Send + Sync {
    fn request_persistent_access(&self, folder: &FolderReference) -> Result<(), AppError>;

    fn release_persistent_access(&self, folder: &FolderReference) -> Result<(), AppError>;
}

/// Grants for local folders: the process either can read a folder or it can't,
/// so requesting access is a readability check and releasing is a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalAccessGrants;

impl AccessGrants for LocalAccessGrants {
    fn request_persistent_access(&self, folder: &FolderReference) -> Result<(), AppError> {
        let path = folder
            .to_local_path()
            .ok_or_else(|| AppError::PermissionGrant(format!("not a local folder: {}", folder)))?;

        std::fs::read_dir(&path)
            .map(|_| ())
            .map_err(|e| AppError::PermissionGrant(format!("{}: {}", path.display(), e)))
    }

    fn release_persistent_access(&self, _folder: &FolderReference) -> Result<(), AppError> {
        Ok(())
    }
}

/// The synchronous list-query contract a host drives per instance.
///
/// `count`, `item_at` and `item_id` are called from the host's worker for the
/// instance and must not block on configuration or listing I/O.
pub trait RemoteListFactory: Send + Sync {
    /// Instance is being bound; build the first snapshot
    fn on_activate(&self);

    /// Host was told the data changed; rebuild the snapshot
    fn on_reload(&self);

    /// Instance is being unbound; drop instance-local state
    fn on_deactivate(&self);

    fn count(&self) -> usize;

    /// `None` for positions outside the current snapshot
    fn item_at(&self, position: usize) -> Option<RenderItem>;

    fn item_id(&self, position: usize) -> u64;

    fn has_stable_ids(&self) -> bool;

    fn view_type_count(&self) -> usize;

    /// `None` lets the host use its default loading view
    fn loading_item(&self) -> Option<RenderItem> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_local_grants() {
        let dir = TempDir::new().unwrap();
        let grants = LocalAccessGrants;

        let present = FolderReference::from_path(dir.path());
        assert!(grants.request_persistent_access(&present).is_ok());
        assert!(grants.release_persistent_access(&present).is_ok());

        let missing = FolderReference::from_path(dir.path().join("missing"));
        assert!(matches!(
            grants.request_persistent_access(&missing),
            Err(AppError::PermissionGrant(_))
        ));

        let remote = FolderReference::parse("mem://album").unwrap();
        assert!(grants.request_persistent_access(&remote).is_err());
    }
}

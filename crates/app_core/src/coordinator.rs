//! Instance lifecycle and refresh coordination
//!
//! Instance state machine:
//! - `Unconfigured -> Configured` when a folder is selected
//! - `Configured -> Configured` on reconfiguration
//! - any state `-> Deleted` when the host removes the instance (terminal)

use crate::host::{AccessGrants, WidgetHost};
use crate::{AppError, AsyncWidgetPrefs};
use app_db::InstanceId;
use app_fs::FolderReference;
use dashmap::DashMap;
use std::sync::Arc;

/// Lifecycle state of one instance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Unconfigured,
    Configured,
    Deleted,
}

/// Refresh trigger; no target means every instance the host knows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshRequest {
    pub target: Option<InstanceId>,
}

impl RefreshRequest {
    pub fn single(id: InstanceId) -> Self {
        Self { target: Some(id) }
    }

    pub fn all() -> Self {
        Self { target: None }
    }
}

/// Sequences configuration writes, host re-render and data-changed notices
pub struct WidgetCoordinator {
    prefs: AsyncWidgetPrefs,
    host: Arc<dyn WidgetHost>,
    grants: Arc<dyn AccessGrants>,
    states: DashMap<InstanceId, InstanceState>,
}

impl WidgetCoordinator {
    pub fn new(prefs: AsyncWidgetPrefs, host: Arc<dyn WidgetHost>, grants: Arc<dyn AccessGrants>) -> Self {
        Self {
            prefs,
            host,
            grants,
            states: DashMap::new(),
        }
    }

    fn is_deleted(&self, id: InstanceId) -> bool {
        self.states
            .get(&id)
            .map_or(false, |state| *state == InstanceState::Deleted)
    }

    /// Current lifecycle state, falling back to the store for instances
    /// this process has not touched yet
    pub async fn state(&self, id: InstanceId) -> InstanceState {
        if let Some(state) = self.states.get(&id).map(|s| *s) {
            return state;
        }
        match self.prefs.get(id).await {
            Some(_) => InstanceState::Configured,
            None => InstanceState::Unconfigured,
        }
    }

    /// Point an instance at a folder.
    ///
    /// Order is fixed: persistent grant (best-effort), store write, host
    /// re-render, data-changed. If the write fails nothing is rendered. If
    /// the instance is deleted while the write is in flight, the write is
    /// undone and the selection reports [`AppError::InstanceDeleted`].
    pub async fn select_folder(&self, id: InstanceId, folder: FolderReference) -> Result<InstanceState, AppError> {
        if self.is_deleted(id) {
            tracing::warn!("Ignoring folder selection for deleted instance {}", id);
            return Err(AppError::InstanceDeleted(id));
        }

        if let Err(e) = self.grants.request_persistent_access(&folder) {
            tracing::warn!("{}; continuing with session access for instance {}", e, id);
        }

        self.prefs.set(id, Some(folder.clone())).await?;

        // A delete may have landed while the write was in flight; Deleted stays terminal
        let deleted = {
            let mut state = self.states.entry(id).or_insert(InstanceState::Configured);
            let deleted = *state == InstanceState::Deleted;
            if !deleted {
                *state = InstanceState::Configured;
            }
            deleted
        };

        if deleted {
            tracing::warn!("Instance {} was deleted during folder selection, discarding {}", id, folder);
            if let Err(e) = self.prefs.remove(id).await {
                tracing::error!("Failed to clear configuration for instance {}: {}", id, e);
            }
            if let Err(e) = self.grants.release_persistent_access(&folder) {
                tracing::warn!("Failed to release access to {}: {}", folder, e);
            }
            return Err(AppError::InstanceDeleted(id));
        }

        tracing::info!("Instance {} configured with {}", id, folder);

        self.host.rerender(id);
        self.host.notify_data_changed(id);

        Ok(InstanceState::Configured)
    }

    /// Ask the host to reload one instance or all of them.
    ///
    /// The host answers a data-changed notice by calling `on_reload` on the
    /// instance's provider, which re-reads configuration and re-enumerates.
    /// Returns the ids that were notified.
    pub fn refresh(&self, request: RefreshRequest) -> Vec<InstanceId> {
        let targets = match request.target {
            Some(id) => vec![id],
            None => self.host.instance_ids(),
        };

        let mut touched = Vec::with_capacity(targets.len());
        for id in targets {
            if self.is_deleted(id) {
                tracing::debug!("Skipping refresh for deleted instance {}", id);
                continue;
            }
            self.host.notify_data_changed(id);
            touched.push(id);
        }

        tracing::debug!("Refreshed {} instance(s)", touched.len());
        touched
    }

    /// Refresh every instance the host knows
    pub fn request_full_refresh(&self) -> Vec<InstanceId> {
        self.refresh(RefreshRequest::all())
    }

    /// Host update hook: re-render then notify each listed instance
    pub fn on_update(&self, ids: &[InstanceId]) {
        for &id in ids {
            if self.is_deleted(id) {
                continue;
            }
            self.host.rerender(id);
            self.host.notify_data_changed(id);
        }
    }

    /// Host removed instances: forget their configuration and stop serving them
    pub async fn delete_instances(&self, ids: &[InstanceId]) {
        for &id in ids {
            self.states.insert(id, InstanceState::Deleted);

            let previous = self.prefs.get(id).await;
            if let Err(e) = self.prefs.remove(id).await {
                tracing::error!("Failed to clear configuration for instance {}: {}", id, e);
            }

            if let Some(folder) = previous {
                if let Err(e) = self.grants.release_persistent_access(&folder) {
                    tracing::warn!("Failed to release access to {}: {}", folder, e);
                }
            }

            tracing::info!("Instance {} deleted", id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tempfile::NamedTempFile;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum HostCall {
        Rerender(InstanceId),
        DataChanged(InstanceId),
    }

    struct RecordingHost {
        known: Vec<InstanceId>,
        calls: Mutex<Vec<HostCall>>,
        prefs: Arc<app_db::WidgetPrefs>,
        // Configuration observed by each re-render
        seen_at_render: Mutex<Vec<Option<FolderReference>>>,
    }

    impl RecordingHost {
        fn calls(&self) -> Vec<HostCall> {
            self.calls.lock().clone()
        }
    }

    impl WidgetHost for RecordingHost {
        fn instance_ids(&self) -> Vec<InstanceId> {
            self.known.clone()
        }

        fn rerender(&self, id: InstanceId) {
            self.seen_at_render.lock().push(self.prefs.get(id));
            self.calls.lock().push(HostCall::Rerender(id));
        }

        fn notify_data_changed(&self, id: InstanceId) {
            self.calls.lock().push(HostCall::DataChanged(id));
        }
    }

    #[derive(Default)]
    struct RecordingGrants {
        deny: bool,
        requested: Mutex<Vec<FolderReference>>,
        released: Mutex<Vec<FolderReference>>,
    }

    impl AccessGrants for RecordingGrants {
        fn request_persistent_access(&self, folder: &FolderReference) -> Result<(), AppError> {
            self.requested.lock().push(folder.clone());
            if self.deny {
                Err(AppError::PermissionGrant("denied".into()))
            } else {
                Ok(())
            }
        }

        fn release_persistent_access(&self, folder: &FolderReference) -> Result<(), AppError> {
            self.released.lock().push(folder.clone());
            Ok(())
        }
    }

    struct Fixture {
        _db: NamedTempFile,
        prefs: Arc<app_db::WidgetPrefs>,
        host: Arc<RecordingHost>,
        grants: Arc<RecordingGrants>,
        coordinator: WidgetCoordinator,
    }

    fn fixture(known: &[i32], deny: bool) -> Fixture {
        let db = NamedTempFile::new().unwrap();
        let prefs = Arc::new(app_db::init(db.path()).unwrap());
        let host = Arc::new(RecordingHost {
            known: known.iter().copied().map(InstanceId).collect(),
            calls: Mutex::new(Vec::new()),
            prefs: prefs.clone(),
            seen_at_render: Mutex::new(Vec::new()),
        });
        let grants = Arc::new(RecordingGrants {
            deny,
            ..Default::default()
        });
        let coordinator = WidgetCoordinator::new(
            AsyncWidgetPrefs::new(prefs.clone()),
            host.clone(),
            grants.clone(),
        );
        Fixture {
            _db: db,
            prefs,
            host,
            grants,
            coordinator,
        }
    }

    fn album(name: &str) -> FolderReference {
        FolderReference::parse(format!("mem://{}", name)).unwrap()
    }

    #[tokio::test]
    async fn test_select_folder_writes_then_renders_then_notifies() {
        let fx = fixture(&[1], false);
        let id = InstanceId(1);
        assert_eq!(fx.coordinator.state(id).await, InstanceState::Unconfigured);

        let state = fx.coordinator.select_folder(id, album("trip")).await.unwrap();

        assert_eq!(state, InstanceState::Configured);
        assert_eq!(fx.prefs.get(id), Some(album("trip")));
        assert_eq!(fx.host.calls(), vec![HostCall::Rerender(id), HostCall::DataChanged(id)]);
        assert_eq!(*fx.host.seen_at_render.lock(), vec![Some(album("trip"))]);
        assert_eq!(*fx.grants.requested.lock(), vec![album("trip")]);
        assert_eq!(fx.coordinator.state(id).await, InstanceState::Configured);
    }

    #[tokio::test]
    async fn test_grant_failure_is_not_fatal() {
        let fx = fixture(&[1], true);
        let id = InstanceId(1);

        let result = fx.coordinator.select_folder(id, album("usb")).await;

        assert!(result.is_ok());
        assert_eq!(fx.prefs.get(id), Some(album("usb")));
        assert_eq!(fx.host.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_reconfigure_overwrites() {
        let fx = fixture(&[2], false);
        let id = InstanceId(2);
        fx.coordinator.select_folder(id, album("old")).await.unwrap();
        fx.coordinator.select_folder(id, album("new")).await.unwrap();
        assert_eq!(fx.prefs.get(id), Some(album("new")));
    }

    #[tokio::test]
    async fn test_refresh_single_touches_only_target() {
        let fx = fixture(&[1, 3, 5], false);
        let touched = fx.coordinator.refresh(RefreshRequest::single(InstanceId(3)));
        assert_eq!(touched, vec![InstanceId(3)]);
        assert_eq!(fx.host.calls(), vec![HostCall::DataChanged(InstanceId(3))]);
    }

    #[tokio::test]
    async fn test_refresh_all_touches_every_known_instance() {
        let fx = fixture(&[1, 3, 5], false);
        let touched = fx.coordinator.request_full_refresh();
        assert_eq!(touched, vec![InstanceId(1), InstanceId(3), InstanceId(5)]);
        assert_eq!(
            fx.host.calls(),
            vec![
                HostCall::DataChanged(InstanceId(1)),
                HostCall::DataChanged(InstanceId(3)),
                HostCall::DataChanged(InstanceId(5)),
            ]
        );
    }

    #[tokio::test]
    async fn test_delete_clears_store_and_stops_refreshes() {
        let fx = fixture(&[3, 4], false);
        let id = InstanceId(3);
        fx.coordinator.select_folder(id, album("gone")).await.unwrap();
        fx.host.calls.lock().clear();

        fx.coordinator.delete_instances(&[id]).await;

        assert_eq!(fx.prefs.get(id), None);
        assert_eq!(fx.coordinator.state(id).await, InstanceState::Deleted);
        assert_eq!(*fx.grants.released.lock(), vec![album("gone")]);

        assert!(fx.coordinator.refresh(RefreshRequest::single(id)).is_empty());
        assert_eq!(fx.coordinator.request_full_refresh(), vec![InstanceId(4)]);
        fx.coordinator.on_update(&[id]);
        assert_eq!(fx.host.calls(), vec![HostCall::DataChanged(InstanceId(4))]);

        let reselect = fx.coordinator.select_folder(id, album("again")).await;
        assert!(matches!(reselect, Err(AppError::InstanceDeleted(_))));
        assert_eq!(fx.prefs.get(id), None);
    }

    #[tokio::test]
    async fn test_delete_unconfigured_instance() {
        let fx = fixture(&[8], false);
        fx.coordinator.delete_instances(&[InstanceId(8)]).await;
        assert!(fx.grants.released.lock().is_empty());
        assert_eq!(fx.coordinator.state(InstanceId(8)).await, InstanceState::Deleted);
    }

    /// Blocks inside the grant request until the test lets it go
    struct GatedGrants {
        entered: std::sync::mpsc::Sender<()>,
        proceed: Mutex<std::sync::mpsc::Receiver<()>>,
        released: Mutex<Vec<FolderReference>>,
    }

    impl AccessGrants for GatedGrants {
        fn request_persistent_access(&self, _folder: &FolderReference) -> Result<(), AppError> {
            self.entered.send(()).unwrap();
            self.proceed.lock().recv().unwrap();
            Ok(())
        }

        fn release_persistent_access(&self, folder: &FolderReference) -> Result<(), AppError> {
            self.released.lock().push(folder.clone());
            Ok(())
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_delete_during_selection_stays_deleted() {
        let db = NamedTempFile::new().unwrap();
        let prefs = Arc::new(app_db::init(db.path()).unwrap());
        let host = Arc::new(RecordingHost {
            known: vec![InstanceId(3)],
            calls: Mutex::new(Vec::new()),
            prefs: prefs.clone(),
            seen_at_render: Mutex::new(Vec::new()),
        });
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (proceed_tx, proceed_rx) = std::sync::mpsc::channel();
        let grants = Arc::new(GatedGrants {
            entered: entered_tx,
            proceed: Mutex::new(proceed_rx),
            released: Mutex::new(Vec::new()),
        });
        let coordinator = Arc::new(WidgetCoordinator::new(
            AsyncWidgetPrefs::new(prefs.clone()),
            host.clone(),
            grants.clone(),
        ));
        let id = InstanceId(3);

        let selecting = tokio::spawn({
            let coordinator = coordinator.clone();
            async move { coordinator.select_folder(id, album("x")).await }
        });
        tokio::task::spawn_blocking(move || entered_rx.recv())
            .await
            .unwrap()
            .unwrap();

        coordinator.delete_instances(&[id]).await;
        assert_eq!(prefs.get(id), None);

        proceed_tx.send(()).unwrap();
        let result = selecting.await.unwrap();

        assert!(matches!(result, Err(AppError::InstanceDeleted(_))));
        assert_eq!(prefs.get(id), None);
        assert_eq!(coordinator.state(id).await, InstanceState::Deleted);
        assert!(coordinator.refresh(RefreshRequest::single(id)).is_empty());
        assert!(host.calls().is_empty());
        assert_eq!(*grants.released.lock(), vec![album("x")]);
    }

    #[tokio::test]
    async fn test_on_update_renders_then_notifies_each() {
        let fx = fixture(&[1, 2], false);
        fx.coordinator.on_update(&[InstanceId(1), InstanceId(2)]);
        assert_eq!(
            fx.host.calls(),
            vec![
                HostCall::Rerender(InstanceId(1)),
                HostCall::DataChanged(InstanceId(1)),
                HostCall::Rerender(InstanceId(2)),
                HostCall::DataChanged(InstanceId(2)),
            ]
        );
    }
}

//! Process-wide context, built once at start-up and passed explicitly

use crate::host::{AccessGrants, WidgetHost};
use crate::{AppConfig, AppError, AsyncWidgetPrefs, WidgetCoordinator, WidgetService};
use app_db::WidgetPrefs;
use app_fs::FolderSource;
use std::sync::Arc;

/// Shared handles every component is built from.
///
/// There is exactly one configuration store per process; everything that
/// needs it receives it from here.
pub struct AppContext {
    pub config: AppConfig,
    pub prefs: Arc<WidgetPrefs>,
    pub source: Arc<dyn FolderSource>,
}

impl AppContext {
    /// Open the configuration store named by `config`
    pub fn new(config: AppConfig, source: Arc<dyn FolderSource>) -> Result<Self, AppError> {
        let db_path = config.storage.resolved_db_path();
        let prefs = app_db::init(&db_path).map_err(|e| AppError::Init(e.to_string()))?;

        Ok(Self::with_prefs(config, Arc::new(prefs), source))
    }

    pub fn with_prefs(config: AppConfig, prefs: Arc<WidgetPrefs>, source: Arc<dyn FolderSource>) -> Self {
        Self {
            config,
            prefs,
            source,
        }
    }

    /// Factory source for per-instance providers
    pub fn service(&self) -> WidgetService {
        WidgetService::from_config(&self.config, self.prefs.clone(), self.source.clone())
    }

    pub fn coordinator(&self, host: Arc<dyn WidgetHost>, grants: Arc<dyn AccessGrants>) -> WidgetCoordinator {
        WidgetCoordinator::new(AsyncWidgetPrefs::new(self.prefs.clone()), host, grants)
    }
}

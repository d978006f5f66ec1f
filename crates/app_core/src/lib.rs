//! PhotoWidget Core Domain Logic
//!
//! This crate contains:
//! - Configuration
//! - Error types
//! - Bounded image decoding
//! - Host contracts (list queries, render/notify, access grants)
//! - Per-instance data provider
//! - Lifecycle and refresh coordination

pub mod config;
pub mod error;
pub mod host;
pub mod image_loader;
pub mod prefs;
pub mod provider;
pub mod coordinator;
pub mod state;

pub use config::{AppConfig, GalleryConfig, LoggingConfig, StorageConfig};
pub use error::AppError;
pub use host::{AccessGrants, LocalAccessGrants, RemoteListFactory, RenderItem, WidgetHost};
pub use image_loader::{calculate_sample_size, BoundedDecoder, DecodedImage};
pub use prefs::AsyncWidgetPrefs;
pub use provider::{WidgetDataProvider, WidgetService};
pub use coordinator::{InstanceState, RefreshRequest, WidgetCoordinator};
pub use state::AppContext;

pub use app_db::InstanceId;
pub use app_fs::{FolderReference, LocalFolderSource};

//! Application error types

use app_db::InstanceId;
use thiserror::Error;

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    // ===== Recoverable Errors (degrade locally, continue) =====
    #[error("Configuration unavailable: {0}")]
    ConfigUnavailable(String),

    #[error("Folder inaccessible: {0}")]
    FolderInaccessible(String),

    #[error("Undecodable image: {0}")]
    Undecodable(String),

    #[error("Persistent access not granted: {0}")]
    PermissionGrant(String),

    // ===== Rejected requests =====
    #[error("Instance {0} has been deleted")]
    InstanceDeleted(InstanceId),

    // ===== Setup Errors (process start) =====
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Initialization failed: {0}")]
    Init(String),
}

impl AppError {
    /// Is this error recoverable?
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::ConfigUnavailable(_)
                | AppError::FolderInaccessible(_)
                | AppError::Undecodable(_)
                | AppError::PermissionGrant(_)
                | AppError::InstanceDeleted(_)
        )
    }

    /// Is this a fatal error?
    pub fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }
}

impl From<app_fs::FsError> for AppError {
    fn from(e: app_fs::FsError) -> Self {
        match e {
            app_fs::FsError::Io(io) => AppError::Io(io),
            other => AppError::FolderInaccessible(other.to_string()),
        }
    }
}

impl From<app_db::DbError> for AppError {
    fn from(e: app_db::DbError) -> Self {
        AppError::ConfigUnavailable(e.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(e: image::ImageError) -> Self {
        AppError::Undecodable(e.to_string())
    }
}

//! PhotoWidget Folder Access Layer
//!
//! Provides everything needed to turn a configured folder into a gallery:
//! - FolderReference: persistable token naming a folder
//! - Folder sources: local file system and in-memory listings
//! - Image filter and the capped, sorted DisplayList snapshot

mod reference;
mod browser;
mod enumerator;

pub use reference::FolderReference;
pub use browser::{FolderSource, LocalFolderSource, MemoryFolderSource, SourceEntry};
pub use enumerator::{enumerate, is_displayable_image, DisplayList, ImageEntry, IMAGE_EXTENSIONS, MAX_ITEMS};

use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid reference: {0}")]
    InvalidReference(String),
}

impl FsError {
    /// Classify an I/O error raised while touching `what`
    pub(crate) fn from_io(err: std::io::Error, what: &str) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound(what.to_string()),
            std::io::ErrorKind::PermissionDenied => FsError::AccessDenied(what.to_string()),
            _ => FsError::Io(err),
        }
    }
}

pub type Result<T> = std::result::Result<T, FsError>;

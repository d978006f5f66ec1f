//! FolderReference - opaque, persistable folder token

use crate::{FsError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const FILE_SCHEME: &str = "file://";

/// A token naming a folder together with whatever grant is needed to read it.
///
/// The token is what gets written to the configuration store, so it must
/// survive a round trip through a plain string unchanged. Local folders use
/// the `file://` scheme; other sources are free to pick their own scheme.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FolderReference(String);

impl FolderReference {
    /// Parse a stored token
    pub fn parse(token: impl Into<String>) -> Result<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(FsError::InvalidReference("empty folder token".into()));
        }
        Ok(Self(token))
    }

    /// Reference a folder on the local file system
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        let absolute = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(path))
                .unwrap_or_else(|_| path.to_path_buf())
        };
        Self(format!("{}{}", FILE_SCHEME, absolute.to_string_lossy()))
    }

    /// Serialized form, suitable for persistence
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local path, if this reference uses the `file://` scheme
    pub fn to_local_path(&self) -> Option<PathBuf> {
        self.0.strip_prefix(FILE_SCHEME).map(PathBuf::from)
    }

    /// Reference to a direct child of this folder.
    ///
    /// A trailing separator is reused rather than stripped, so the root
    /// folder `file:///` keeps its scheme intact.
    pub fn child(&self, name: &str) -> String {
        if self.0.ends_with('/') {
            format!("{}{}", self.0, name)
        } else {
            format!("{}/{}", self.0, name)
        }
    }
}

impl fmt::Display for FolderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

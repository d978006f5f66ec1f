//! Folder sources - listing direct children and reading their bytes

use crate::{FolderReference, FsError, Result};
use parking_lot::RwLock;
use rayon::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Bytes inspected when sniffing a file's content type
const SNIFF_LEN: u64 = 32;

/// A direct child of a folder, as reported by its source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceEntry {
    /// Reference used to read the entry back
    pub uri: String,
    pub name: String,
    pub is_file: bool,
    /// Mime type, when the source knows it
    pub mime_type: Option<String>,
}

/// Something that can list a folder and hand out the bytes of its files.
///
/// Listing order must be deterministic for an unchanged folder.
pub trait FolderSource: Send + Sync {
    /// List the direct children of `folder`
    fn list_children(&self, folder: &FolderReference) -> Result<Vec<SourceEntry>>;

    /// Read the full contents of an entry previously returned by `list_children`
    fn read(&self, uri: &str) -> Result<Vec<u8>>;
}

/// Folder source backed by the local file system
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFolderSource;

impl LocalFolderSource {
    pub fn new() -> Self {
        Self
    }

    fn describe(folder: &FolderReference, path: &Path) -> Option<SourceEntry> {
        let name = path.file_name()?.to_string_lossy().to_string();
        // Follows symlinks, so a link to an image counts as a file
        let metadata = fs::metadata(path).ok()?;
        let is_file = metadata.is_file();
        let mime_type = if is_file { sniff_mime_type(path) } else { None };

        Some(SourceEntry {
            uri: folder.child(&name),
            name,
            is_file,
            mime_type,
        })
    }
}

impl FolderSource for LocalFolderSource {
    fn list_children(&self, folder: &FolderReference) -> Result<Vec<SourceEntry>> {
        let path = folder
            .to_local_path()
            .ok_or_else(|| FsError::InvalidReference(folder.to_string()))?;
        let shown = path.display().to_string();

        if !path.exists() {
            return Err(FsError::NotFound(shown));
        }

        if !path.is_dir() {
            return Err(FsError::InvalidReference(format!("Not a directory: {}", shown)));
        }

        let mut children: Vec<PathBuf> = fs::read_dir(&path)
            .map_err(|e| FsError::from_io(e, &shown))?
            .filter_map(|entry| entry.ok()) // Skip entries we can't read
            .map(|entry| entry.path())
            .collect();

        // read_dir order is unspecified
        children.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        Ok(children
            .par_iter()
            .filter_map(|child| Self::describe(folder, child))
            .collect())
    }

    fn read(&self, uri: &str) -> Result<Vec<u8>> {
        let reference = FolderReference::parse(uri)?;
        let path = reference
            .to_local_path()
            .ok_or_else(|| FsError::InvalidReference(uri.to_string()))?;
        fs::read(&path).map_err(|e| FsError::from_io(e, uri))
    }
}

/// Guess a mime type from the leading bytes of a file
fn sniff_mime_type(path: &Path) -> Option<String> {
    let file = fs::File::open(path).ok()?;
    let mut header = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN).read_to_end(&mut header).ok()?;

    image::guess_format(&header)
        .ok()
        .map(|format| format.to_mime_type().to_string())
}

#[derive(Debug, Clone)]
struct MemoryChild {
    name: String,
    is_file: bool,
    mime_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
struct MemoryFolder {
    accessible: bool,
    children: Vec<MemoryChild>,
}

impl Default for MemoryFolder {
    fn default() -> Self {
        Self {
            accessible: true,
            children: Vec::new(),
        }
    }
}

/// In-memory folder source for hosts that supply their own documents.
///
/// Children are listed in insertion order.
#[derive(Debug, Default)]
pub struct MemoryFolderSource {
    folders: RwLock<HashMap<FolderReference, MemoryFolder>>,
}

impl MemoryFolderSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty folder (no-op if it exists)
    pub fn create_folder(&self, folder: &FolderReference) {
        self.folders.write().entry(folder.clone()).or_default();
    }

    /// Add a file, creating the folder if needed
    pub fn add_file(&self, folder: &FolderReference, name: &str, mime_type: Option<&str>, bytes: Vec<u8>) {
        self.push_child(
            folder,
            MemoryChild {
                name: name.to_string(),
                is_file: true,
                mime_type: mime_type.map(str::to_string),
                bytes,
            },
        );
    }

    /// Add a sub-folder entry
    pub fn add_dir(&self, folder: &FolderReference, name: &str) {
        self.push_child(
            folder,
            MemoryChild {
                name: name.to_string(),
                is_file: false,
                mime_type: None,
                bytes: Vec::new(),
            },
        );
    }

    /// Drop every child of a folder, keeping the folder itself
    pub fn clear_folder(&self, folder: &FolderReference) {
        if let Some(entry) = self.folders.write().get_mut(folder) {
            entry.children.clear();
        }
    }

    /// Remove a folder entirely; later listings report it as missing
    pub fn remove_folder(&self, folder: &FolderReference) {
        self.folders.write().remove(folder);
    }

    /// Grant or revoke read access to a folder
    pub fn set_accessible(&self, folder: &FolderReference, accessible: bool) {
        if let Some(entry) = self.folders.write().get_mut(folder) {
            entry.accessible = accessible;
        }
    }

    fn push_child(&self, folder: &FolderReference, child: MemoryChild) {
        self.folders
            .write()
            .entry(folder.clone())
            .or_default()
            .children
            .push(child);
    }
}

impl FolderSource for MemoryFolderSource {
    fn list_children(&self, folder: &FolderReference) -> Result<Vec<SourceEntry>> {
        let folders = self.folders.read();
        let entry = folders
            .get(folder)
            .ok_or_else(|| FsError::NotFound(folder.to_string()))?;

        if !entry.accessible {
            return Err(FsError::AccessDenied(folder.to_string()));
        }

        Ok(entry
            .children
            .iter()
            .map(|child| SourceEntry {
                uri: folder.child(&child.name),
                name: child.name.clone(),
                is_file: child.is_file,
                mime_type: child.mime_type.clone(),
            })
            .collect())
    }

    fn read(&self, uri: &str) -> Result<Vec<u8>> {
        let folders = self.folders.read();
        for (reference, folder) in folders.iter() {
            let found = folder
                .children
                .iter()
                .find(|child| child.is_file && reference.child(&child.name) == uri);
            if let Some(child) = found {
                if !folder.accessible {
                    return Err(FsError::AccessDenied(uri.to_string()));
                }
                return Ok(child.bytes.clone());
            }
        }
        Err(FsError::NotFound(uri.to_string()))
    }
}

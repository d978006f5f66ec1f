//! Image enumeration - filtered, sorted, capped gallery snapshots

use crate::{FolderReference, FolderSource, SourceEntry};
use std::sync::Arc;

/// Upper bound on the number of images a gallery shows
pub const MAX_ITEMS: usize = 60;

/// Extensions accepted when a file's mime type says nothing useful
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// One displayable image in a folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub uri: String,
    pub display_name: String,
    pub mime_type: Option<String>,
}

impl ImageEntry {
    /// Lowercased file extension, if any
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.display_name)
    }
}

impl From<SourceEntry> for ImageEntry {
    fn from(entry: SourceEntry) -> Self {
        Self {
            uri: entry.uri,
            display_name: entry.name,
            mime_type: entry.mime_type,
        }
    }
}

/// Immutable, ordered gallery snapshot.
///
/// A position in the list is the entry's identity for as long as this
/// snapshot is published. Reloading builds a new list instead of editing
/// this one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayList {
    entries: Arc<[ImageEntry]>,
}

impl DisplayList {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&ImageEntry> {
        self.entries.get(position)
    }

    pub fn entries(&self) -> &[ImageEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImageEntry> {
        self.entries.iter()
    }
}

fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.').map(|(_, ext)| ext.to_lowercase())
}

/// Image filter: regular files whose mime type is `image/*`, or whose
/// extension is a known image extension (case-insensitive).
pub fn is_displayable_image(entry: &SourceEntry) -> bool {
    if !entry.is_file {
        return false;
    }

    if entry
        .mime_type
        .as_deref()
        .map_or(false, |mime| mime.starts_with("image/"))
    {
        return true;
    }

    extension_of(&entry.name)
        .map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

/// Build a gallery snapshot for `folder`.
///
/// Lists direct children, keeps image files, sorts ascending by name
/// (stable, so equal names keep listing order) and truncates to
/// `max_items` (never more than [`MAX_ITEMS`]). An unconfigured folder
/// yields an empty list without touching the source; a folder that can no
/// longer be listed yields an empty list too.
pub fn enumerate(source: &dyn FolderSource, folder: Option<&FolderReference>, max_items: usize) -> DisplayList {
    let Some(folder) = folder else {
        return DisplayList::empty();
    };

    let children = match source.list_children(folder) {
        Ok(children) => children,
        Err(e) => {
            tracing::warn!("Folder {} is not accessible, showing nothing: {}", folder, e);
            return DisplayList::empty();
        }
    };

    let mut images: Vec<SourceEntry> = children
        .into_iter()
        .filter(is_displayable_image)
        .collect();

    images.sort_by(|a, b| a.name.cmp(&b.name));
    images.truncate(max_items.min(MAX_ITEMS));

    tracing::debug!("Enumerated {} images in {}", images.len(), folder);

    DisplayList {
        entries: images.into_iter().map(ImageEntry::from).collect(),
    }
}

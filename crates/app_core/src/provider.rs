//! Per-instance gallery data provider
//!
//! Follows a prefetch-then-serve discipline: configuration and folder
//! listing happen only in `on_activate`/`on_reload`, which publish a new
//! immutable [`DisplayList`]. The query path (`count`, `item_at`,
//! `item_id`) only ever reads the published snapshot.

use crate::host::{RemoteListFactory, RenderItem};
use crate::{AppConfig, BoundedDecoder};
use app_db::{InstanceId, WidgetPrefs};
use app_fs::{enumerate, DisplayList, FolderSource};
use parking_lot::RwLock;
use std::sync::Arc;

/// Hands out one independent provider per widget instance
#[derive(Clone)]
pub struct WidgetService {
    prefs: Arc<WidgetPrefs>,
    source: Arc<dyn FolderSource>,
    decoder: BoundedDecoder,
    max_items: usize,
}

impl WidgetService {
    pub fn new(
        prefs: Arc<WidgetPrefs>,
        source: Arc<dyn FolderSource>,
        decoder: BoundedDecoder,
        max_items: usize,
    ) -> Self {
        Self {
            prefs,
            source,
            decoder,
            max_items,
        }
    }

    pub fn from_config(config: &AppConfig, prefs: Arc<WidgetPrefs>, source: Arc<dyn FolderSource>) -> Self {
        Self::new(
            prefs,
            source,
            BoundedDecoder::new(config.gallery.target_width, config.gallery.target_height),
            config.gallery.effective_max_items(),
        )
    }

    /// New provider for `id`; the host calls `on_activate` before querying it
    pub fn view_factory(&self, id: InstanceId) -> WidgetDataProvider {
        WidgetDataProvider {
            instance_id: id,
            prefs: self.prefs.clone(),
            source: self.source.clone(),
            decoder: self.decoder,
            max_items: self.max_items,
            snapshot: RwLock::new(DisplayList::empty()),
        }
    }
}

/// Serves the gallery of a single widget instance
pub struct WidgetDataProvider {
    instance_id: InstanceId,
    prefs: Arc<WidgetPrefs>,
    source: Arc<dyn FolderSource>,
    decoder: BoundedDecoder,
    max_items: usize,
    snapshot: RwLock<DisplayList>,
}

impl WidgetDataProvider {
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// The currently published snapshot
    pub fn snapshot(&self) -> DisplayList {
        self.snapshot.read().clone()
    }

    /// Resolve configuration, enumerate, then swap in the new snapshot
    fn reload(&self) {
        let folder = self.prefs.get(self.instance_id);
        let list = enumerate(self.source.as_ref(), folder.as_ref(), self.max_items);

        tracing::debug!(
            "Publishing snapshot for instance {}: {} images",
            self.instance_id,
            list.len()
        );
        *self.snapshot.write() = list;
    }
}

impl RemoteListFactory for WidgetDataProvider {
    fn on_activate(&self) {
        self.reload();
    }

    fn on_reload(&self) {
        self.reload();
    }

    fn on_deactivate(&self) {
        *self.snapshot.write() = DisplayList::empty();
    }

    fn count(&self) -> usize {
        self.snapshot.read().len()
    }

    fn item_at(&self, position: usize) -> Option<RenderItem> {
        let entry = self.snapshot().get(position)?.clone();

        match self.decoder.decode(self.source.as_ref(), &entry) {
            Ok(image) => Some(RenderItem::Image(image)),
            Err(e) => {
                tracing::debug!("Showing placeholder for {}: {}", entry.display_name, e);
                Some(RenderItem::Placeholder)
            }
        }
    }

    fn item_id(&self, position: usize) -> u64 {
        position as u64
    }

    fn has_stable_ids(&self) -> bool {
        true
    }

    fn view_type_count(&self) -> usize {
        1
    }
}

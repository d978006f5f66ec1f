//! Console host for widget instances

use anyhow::{Context, Result};
use app_core::{
    AppConfig, AppContext, InstanceId, LocalAccessGrants, RefreshRequest, RemoteListFactory,
    RenderItem, WidgetDataProvider, WidgetHost, WidgetService,
};
use app_db::WidgetPrefs;
use app_fs::{FolderReference, LocalFolderSource};
use clap::{Parser, Subcommand};
use dashmap::DashMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "photo_widget", about = "Folder gallery widgets, hosted on the console")]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Write each rendered raster as PNG into this directory
    #[arg(long, global = true)]
    out: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Point an instance at a folder
    Configure { id: i32, folder: PathBuf },
    /// Render the gallery of an instance
    Render { id: i32 },
    /// Reload one instance, or every known instance
    Refresh {
        #[arg(long)]
        id: Option<i32>,
    },
    /// Remove instances and their configuration
    Delete {
        #[arg(required = true)]
        ids: Vec<i32>,
    },
    /// Show configured instances
    List,
}

/// Host surface that keeps one provider per bound instance and renders
/// galleries as text (and optionally PNG files).
pub struct ConsoleHost {
    service: WidgetService,
    prefs: Arc<WidgetPrefs>,
    providers: DashMap<InstanceId, Arc<WidgetDataProvider>>,
    out_dir: Option<PathBuf>,
}

impl ConsoleHost {
    pub fn new(service: WidgetService, prefs: Arc<WidgetPrefs>, out_dir: Option<PathBuf>) -> Self {
        Self {
            service,
            prefs,
            providers: DashMap::new(),
            out_dir,
        }
    }

    /// Provider bound to `id`, activating it on first use
    fn provider(&self, id: InstanceId) -> Arc<WidgetDataProvider> {
        self.providers
            .entry(id)
            .or_insert_with(|| {
                let provider = Arc::new(self.service.view_factory(id));
                provider.on_activate();
                provider
            })
            .clone()
    }

    fn unbind(&self, id: InstanceId) {
        if let Some((_, provider)) = self.providers.remove(&id) {
            provider.on_deactivate();
        }
    }

    fn save_raster(&self, id: InstanceId, position: usize, width: u32, height: u32, data: Vec<u8>) {
        let Some(dir) = &self.out_dir else {
            return;
        };

        let path = dir.join(format!("widget_{}_{:02}.png", id, position));
        let saved = std::fs::create_dir_all(dir)
            .map_err(anyhow::Error::from)
            .and_then(|_| {
                image::RgbaImage::from_raw(width, height, data)
                    .context("raster size mismatch")?
                    .save(&path)
                    .map_err(anyhow::Error::from)
            });

        if let Err(e) = saved {
            tracing::warn!("Failed to write {:?}: {}", path, e);
        }
    }
}

impl WidgetHost for ConsoleHost {
    fn instance_ids(&self) -> Vec<InstanceId> {
        let mut ids = self.prefs.instance_ids().unwrap_or_else(|e| {
            tracing::warn!("Failed to list configured instances: {}", e);
            Vec::new()
        });
        ids.extend(self.providers.iter().map(|p| *p.key()));
        ids.sort();
        ids.dedup();
        ids
    }

    fn rerender(&self, id: InstanceId) {
        let provider = self.provider(id);
        let count = provider.count();

        match self.prefs.get(id) {
            Some(folder) => println!("Widget {} ({}): {} image(s)", id, folder, count),
            None => println!("Widget {}: no folder selected", id),
        }

        for position in 0..count {
            let name = provider
                .snapshot()
                .get(position)
                .map(|e| e.display_name.clone())
                .unwrap_or_default();

            match provider.item_at(position) {
                Some(RenderItem::Image(image)) => {
                    println!(
                        "  [{:02}] {} {}x{} (1/{})",
                        provider.item_id(position),
                        name,
                        image.width,
                        image.height,
                        image.sample_size
                    );
                    self.save_raster(id, position, image.width, image.height, image.data);
                }
                Some(RenderItem::Placeholder) => {
                    println!("  [{:02}] {} <placeholder>", provider.item_id(position), name);
                }
                None => break,
            }
        }
    }

    fn notify_data_changed(&self, id: InstanceId) {
        let provider = self.provider(id);
        provider.on_reload();
        tracing::debug!("Instance {} reloaded: {} image(s)", id, provider.count());
    }
}

pub async fn run(cli: Cli, config: AppConfig) -> Result<()> {
    let ctx = AppContext::new(config, Arc::new(LocalFolderSource::new()))?;
    let host = Arc::new(ConsoleHost::new(ctx.service(), ctx.prefs.clone(), cli.out));
    let coordinator = ctx.coordinator(host.clone(), Arc::new(LocalAccessGrants));

    match cli.command {
        Commands::Configure { id, folder } => {
            let folder = FolderReference::from_path(&folder);
            coordinator.select_folder(InstanceId(id), folder).await?;
        }
        Commands::Render { id } => host.rerender(InstanceId(id)),
        Commands::Refresh { id } => {
            let request = match id {
                Some(id) => RefreshRequest::single(InstanceId(id)),
                None => RefreshRequest::all(),
            };
            let refreshed = coordinator.refresh(request);
            for id in &refreshed {
                host.rerender(*id);
            }
            println!("Refreshed {} widget(s)", refreshed.len());
        }
        Commands::Delete { ids } => {
            let ids: Vec<InstanceId> = ids.into_iter().map(InstanceId).collect();
            coordinator.delete_instances(&ids).await;
            for id in &ids {
                host.unbind(*id);
            }
            println!("Deleted {} widget(s)", ids.len());
        }
        Commands::List => {
            for id in ctx.prefs.instance_ids()? {
                if let Some(folder) = ctx.prefs.get(id) {
                    println!("{}\t{}", id, folder);
                }
            }
        }
    }

    tracing::info!("PhotoWidget finished");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_core::BoundedDecoder;
    use app_fs::MemoryFolderSource;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let mut bytes = Vec::new();
        image::RgbaImage::new(width, height)
            .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    fn setup(out_dir: Option<PathBuf>) -> (TempDir, Arc<MemoryFolderSource>, Arc<WidgetPrefs>, ConsoleHost) {
        let dir = TempDir::new().unwrap();
        let prefs = Arc::new(app_db::init(&dir.path().join("prefs.db")).unwrap());
        let source = Arc::new(MemoryFolderSource::new());
        let service = WidgetService::new(prefs.clone(), source.clone(), BoundedDecoder::new(8, 8), 60);
        let host = ConsoleHost::new(service, prefs.clone(), out_dir);
        (dir, source, prefs, host)
    }

    #[test]
    fn test_instance_ids_merge_store_and_bound() {
        let (_dir, _source, prefs, host) = setup(None);
        let folder = FolderReference::parse("mem://a").unwrap();
        prefs.set(InstanceId(3), Some(&folder)).unwrap();
        prefs.set(InstanceId(1), Some(&folder)).unwrap();

        host.rerender(InstanceId(2));
        host.rerender(InstanceId(3));

        assert_eq!(host.instance_ids(), vec![InstanceId(1), InstanceId(2), InstanceId(3)]);
    }

    #[test]
    fn test_notify_reloads_bound_provider() {
        let (_dir, source, prefs, host) = setup(None);
        let folder = FolderReference::parse("mem://album").unwrap();
        source.add_file(&folder, "a.png", Some("image/png"), png_bytes(4, 4));
        prefs.set(InstanceId(1), Some(&folder)).unwrap();

        host.rerender(InstanceId(1));
        assert_eq!(host.provider(InstanceId(1)).count(), 1);

        source.add_file(&folder, "b.png", Some("image/png"), png_bytes(4, 4));
        assert_eq!(host.provider(InstanceId(1)).count(), 1);

        host.notify_data_changed(InstanceId(1));
        assert_eq!(host.provider(InstanceId(1)).count(), 2);
    }

    #[test]
    fn test_rerender_writes_rasters() {
        let out = TempDir::new().unwrap();
        let (_dir, source, prefs, host) = setup(Some(out.path().to_path_buf()));
        let folder = FolderReference::parse("mem://album").unwrap();
        source.add_file(&folder, "a.png", Some("image/png"), png_bytes(40, 20));
        source.add_file(&folder, "b.png", Some("image/png"), b"broken".to_vec());
        prefs.set(InstanceId(5), Some(&folder)).unwrap();

        host.rerender(InstanceId(5));

        let saved = image::open(out.path().join("widget_5_00.png")).unwrap();
        assert_eq!((saved.width(), saved.height()), (20, 10));
        assert!(!out.path().join("widget_5_01.png").exists());
    }

    #[test]
    fn test_unbind_drops_provider() {
        let (_dir, _source, _prefs, host) = setup(None);
        host.rerender(InstanceId(9));
        host.unbind(InstanceId(9));
        assert!(host.instance_ids().is_empty());
    }
}

//! Application configuration

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gallery: GalleryConfig,
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

/// What a gallery shows and how large its rasters may get
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GalleryConfig {
    /// Decoder target box width; rasters stay within roughly twice this
    pub target_width: u32,
    /// Decoder target box height
    pub target_height: u32,
    /// Images per gallery, clamped to `app_fs::MAX_ITEMS`
    pub max_items: usize,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            target_width: 600,
            target_height: 600,
            max_items: app_fs::MAX_ITEMS,
        }
    }
}

impl GalleryConfig {
    /// `max_items` after applying the hard cap
    pub fn effective_max_items(&self) -> usize {
        self.max_items.min(app_fs::MAX_ITEMS)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Preferences database; defaults to the platform data dir
    pub db_path: Option<PathBuf>,
}

impl StorageConfig {
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(app_db::default_db_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Days to keep rolled log files
    pub retention_days: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { retention_days: 7 }
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Self = toml::from_str(&content)?;
            tracing::info!("Configuration loaded from {:?}", config_path);
            Ok(config)
        } else {
            tracing::info!("Using default configuration");
            Ok(Self::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;

        tracing::info!("Configuration saved to {:?}", config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        ProjectDirs::from("com", "PhotoWidget", "PhotoWidget")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from("./config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.gallery.target_width, 600);
        assert_eq!(config.gallery.target_height, 600);
        assert_eq!(config.gallery.effective_max_items(), 60);
        assert_eq!(config.logging.retention_days, 7);
    }

    #[test]
    fn test_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [gallery]
            max_items = 200

            [storage]
            db_path = "/tmp/prefs.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.gallery.target_width, 600);
        assert_eq!(config.gallery.effective_max_items(), 60);
        assert_eq!(config.storage.resolved_db_path(), PathBuf::from("/tmp/prefs.db"));
    }

    #[test]
    fn test_round_trip() {
        let mut config = AppConfig::default();
        config.gallery.max_items = 12;
        let text = toml::to_string_pretty(&config).unwrap();
        assert_eq!(toml::from_str::<AppConfig>(&text).unwrap(), config);
    }
}

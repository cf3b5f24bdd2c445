use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub globe: GlobeConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub timezone: TimezoneConfig,
    #[serde(default)]
    pub ui: UiConfig,
    #[serde(default)]
    pub paths: PathsConfig,
}

/// Station catalog source: an `http(s)://` URL or a local file path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_catalog_source")]
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobeConfig {
    #[serde(default = "default_base_radius")]
    pub base_radius: f64,
    #[serde(default = "default_min_scale")]
    pub min_scale: f64,
    #[serde(default = "default_max_scale")]
    pub max_scale: f64,
    /// Scale change per zoom keystroke / wheel notch.
    #[serde(default = "default_zoom_step")]
    pub zoom_step: f64,
    #[serde(default = "default_hover_threshold_px")]
    pub hover_threshold_px: f64,
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// 0..=100
    #[serde(default = "default_volume")]
    pub default_volume: u8,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimezoneConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_zones_url")]
    pub zones_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Used until the user picks a language; the persisted choice wins.
    #[serde(default = "default_language")]
    pub default_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// JSON file backing favorites, history and language.
    #[serde(default = "default_storage_file")]
    pub storage_file: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: default_catalog_source(),
        }
    }
}

impl Default for GlobeConfig {
    fn default() -> Self {
        Self {
            base_radius: default_base_radius(),
            min_scale: default_min_scale(),
            max_scale: default_max_scale(),
            zoom_step: default_zoom_step(),
            hover_threshold_px: default_hover_threshold_px(),
            frame_rate: default_frame_rate(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            default_volume: default_volume(),
            history_limit: default_history_limit(),
        }
    }
}

impl Default for TimezoneConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            zones_url: default_zones_url(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            default_language: default_language(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            storage_file: default_storage_file(),
        }
    }
}

fn default_catalog_source() -> String {
    let local = PathBuf::from("stations.json");
    if local.exists() {
        return local.display().to_string();
    }
    platform::config_dir()
        .join("stations.json")
        .display()
        .to_string()
}

fn default_base_radius() -> f64 {
    2.0
}

fn default_min_scale() -> f64 {
    0.5
}

fn default_max_scale() -> f64 {
    2.5
}

fn default_zoom_step() -> f64 {
    0.1
}

fn default_hover_threshold_px() -> f64 {
    10.0
}

fn default_frame_rate() -> u32 {
    30
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_volume() -> u8 {
    80
}

fn default_history_limit() -> usize {
    50
}

fn default_true() -> bool {
    true
}

fn default_zones_url() -> String {
    "https://worldtimeapi.org/api/timezone".to_string()
}

fn default_language() -> String {
    "zh".to_string()
}

fn default_storage_file() -> PathBuf {
    platform::data_dir().join("storage.json")
}

impl Config {
    /// Loads `<config_dir>/config.toml`, writing the defaults back when the
    /// file does not exist yet.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(config_path: &Path) -> anyhow::Result<Self> {
        if !config_path.exists() {
            let config = Self::default();
            config.save_to(config_path)?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to(&self, config_path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.globe.base_radius, 2.0);
        assert_eq!(config.globe.hover_threshold_px, 10.0);
        assert_eq!(config.globe.frame_rate, 30);
        assert_eq!(config.playback.timeout_secs, 5);
        assert_eq!(config.playback.history_limit, 50);
        assert!(config.timezone.zones_url.starts_with("https://"));
        assert_eq!(config.ui.default_language, "zh");
        assert!(config.paths.storage_file.ends_with("globe-radio/storage.json"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config: Config = toml::from_str("[globe]\nmax_scale = 5.0\n").unwrap();
        assert_eq!(config.globe.max_scale, 5.0);
        assert_eq!(config.globe.min_scale, 0.5);
        assert_eq!(config.playback.default_volume, 80);
    }

    #[test]
    fn test_missing_file_is_written_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        let again = Config::load_from(&path).unwrap();
        assert_eq!(again.catalog.source, config.catalog.source);
    }
}

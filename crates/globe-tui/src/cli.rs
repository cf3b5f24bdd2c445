use std::path::PathBuf;

use clap::Parser;
use globe_proto::config::Config;

#[derive(Parser, Debug, Default)]
#[command(about = "Browse and play internet radio on a 3D globe in the terminal", version)]
pub struct Args {
    /// Config file (default: ~/.config/globe-radio/config.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Station catalog: a local JSON file or an http(s) URL
    #[arg(long)]
    pub catalog: Option<String>,

    /// UI language when none has been saved yet (en, it, zh)
    #[arg(long)]
    pub lang: Option<String>,

    /// JSON file holding favorites, history and language
    #[arg(long)]
    pub storage: Option<PathBuf>,

    /// Skip the online zone list and use the built-in country table
    #[arg(long)]
    pub offline_timezones: bool,
}

impl Args {
    /// Command-line values win over the config file.
    pub fn apply(&self, config: &mut Config) {
        if let Some(catalog) = &self.catalog {
            config.catalog.source = catalog.clone();
        }
        if let Some(lang) = &self.lang {
            config.ui.default_language = lang.clone();
        }
        if let Some(storage) = &self.storage {
            config.paths.storage_file = storage.clone();
        }
        if self.offline_timezones {
            config.timezone.enabled = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::parse_from([
            "globe-radio",
            "--catalog",
            "https://example.org/stations.json",
            "--lang",
            "it",
            "--offline-timezones",
        ]);
        let mut config = Config::default();
        args.apply(&mut config);
        assert_eq!(config.catalog.source, "https://example.org/stations.json");
        assert_eq!(config.ui.default_language, "it");
        assert!(!config.timezone.enabled);
    }

    #[test]
    fn test_no_flags_keep_config() {
        let mut config = Config::default();
        let before = config.catalog.source.clone();
        Args::parse_from(["globe-radio"]).apply(&mut config);
        assert_eq!(config.catalog.source, before);
        assert!(config.timezone.enabled);
    }
}

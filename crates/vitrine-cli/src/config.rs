//! Configuration loading from TOML files

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Deserialize;

/// Global configuration for vitrine
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub assets: AssetsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AssetsConfig {
    /// Root directory of the asset store; created on first use.
    pub root_dir: PathBuf,
    /// Subdirectory promoted product images land in.
    pub final_subdir: String,
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("./uploads"),
            final_subdir: "products".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from default locations
    ///
    /// Search order:
    /// 1. ./vitrine.toml (current directory)
    /// 2. ~/.config/vitrine/config.toml
    ///
    /// If no config file found, returns default config.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("vitrine.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "vitrine") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.assets.root_dir, PathBuf::from("./uploads"));
        assert_eq!(config.assets.final_subdir, "products");
    }

    #[test]
    fn parse_config_toml() {
        let toml = r#"
[assets]
root_dir = "/srv/vitrine/uploads"
final_subdir = "images"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.assets.root_dir, PathBuf::from("/srv/vitrine/uploads"));
        assert_eq!(config.assets.final_subdir, "images");
    }

    #[test]
    fn partial_config_fills_defaults() {
        let config: Config = toml::from_str("[assets]\nroot_dir = \"/tmp/u\"\n").unwrap();
        assert_eq!(config.assets.root_dir, PathBuf::from("/tmp/u"));
        assert_eq!(config.assets.final_subdir, "products");
    }
}

use crate::lineage::DesignationParams;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Also write a per-lineage summary next to the sequence table.
    #[serde(default = "default_write_summary")]
    pub write_summary: bool,
    #[serde(default)]
    pub designation: DesignationParams,
}

fn default_write_summary() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            write_summary: default_write_summary(),
            designation: DesignationParams::default(),
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "lineage", "lineage-designator")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load the user config, falling back to defaults when it is absent or
    /// unreadable.
    pub fn load() -> Self {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                match Self::load_from(&config_path) {
                    Ok(config) => return config,
                    Err(e) => warn!("ignoring config {}: {:#}", config_path.display(), e),
                }
            }
        }
        Config::default()
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn save(&self) -> Result<PathBuf> {
        let config_path =
            Self::default_path().context("Could not determine a config directory")?;
        self.save_to(&config_path)?;
        Ok(config_path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config: Config = toml::from_str("[designation]\nmin_support = 90.0\n").unwrap();
        assert_eq!(config.designation.min_support, 90.0);
        assert_eq!(config.designation.min_cluster_tips, 5);
        assert!(config.write_summary);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut config = Config::default();
        config.designation.max_dot_depth = 3;
        config.write_summary = false;
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }
}

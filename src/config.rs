/// Application configuration
///
/// Every field has a default, so a partial JSON file is enough and a missing
/// or broken file falls back to the defaults.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{error, info};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Uploaded files and the reports generated from them
    pub upload_folder: PathBuf,
    /// Static assets; the heatmap is written here
    pub static_folder: PathBuf,
    /// Output folder for the `analyze` command
    pub report_folder: PathBuf,
    pub bind_address: String,
    pub max_upload_mb: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            upload_folder: PathBuf::from("uploads"),
            static_folder: PathBuf::from("static"),
            report_folder: PathBuf::from("reports"),
            bind_address: "127.0.0.1:5000".to_string(),
            max_upload_mb: 50,
        }
    }
}

impl AppConfig {
    /// Load configuration from file if provided
    ///
    /// # Arguments
    ///
    /// * `config_path` - Optional path to a JSON configuration file
    ///
    /// # Returns
    ///
    /// The loaded configuration; defaults when the path is absent, missing
    /// or does not hold valid JSON
    pub fn load(config_path: Option<&Path>) -> Self {
        let Some(path) = config_path else {
            return Self::default();
        };

        if !path.exists() {
            error!("Configuration file not found: {}", path.display());
            return Self::default();
        }

        let config_str = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                error!("Failed to read configuration file {}: {}", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str(&config_str) {
            Ok(config) => {
                info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                error!("Invalid JSON in configuration file: {}", e);
                Self::default()
            }
        }
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }

    /// Create the upload and static folders
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.upload_folder, &self.static_folder] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        let config = AppConfig::load(None);
        assert_eq!(config.upload_folder, PathBuf::from("uploads"));
        assert_eq!(config.static_folder, PathBuf::from("static"));
        assert_eq!(config.bind_address, "127.0.0.1:5000");
        assert_eq!(config.max_upload_bytes(), 50 * 1024 * 1024);
    }

    #[test]
    fn test_partial_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"upload_folder": "/tmp/up", "max_upload_mb": 5}}"#).unwrap();

        let config = AppConfig::load(Some(file.path()));
        assert_eq!(config.upload_folder, PathBuf::from("/tmp/up"));
        assert_eq!(config.max_upload_mb, 5);
        assert_eq!(config.static_folder, PathBuf::from("static"));
    }

    #[test]
    fn test_invalid_or_missing_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert_eq!(AppConfig::load(Some(file.path())), AppConfig::default());

        let missing = Path::new("/definitely/not/here.json");
        assert_eq!(AppConfig::load(Some(missing)), AppConfig::default());
    }

    #[test]
    fn test_ensure_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig {
            upload_folder: dir.path().join("up"),
            static_folder: dir.path().join("static"),
            ..AppConfig::default()
        };

        config.ensure_dirs().unwrap();
        assert!(config.upload_folder.is_dir());
        assert!(config.static_folder.is_dir());
    }
}

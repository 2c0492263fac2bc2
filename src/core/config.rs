//! Configuration management for ferroscan.
//!
//! Location of persisted state and the default backend choice live here;
//! engine logic never resolves paths on its own.

use crate::core::error::{Error, Result};
use crate::core::types::StorageKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Scan-related settings
    pub scan: ScanConfig,
    /// Default storage backend when none is given on the command line
    pub default_storage: StorageKind,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scan: ScanConfig::default(),
            default_storage: StorageKind::Json,
        }
    }
}

/// Scan-related configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Files up to this size are read fully into memory; larger files are
    /// stream-hashed and only a leading sample is analyzed
    pub max_inline_bytes: u64,
    /// Leading sample size for header/entropy analysis of large files
    pub analysis_sample_bytes: usize,
    /// Number of parallel scan workers for directory scans
    pub scan_workers: usize,
    /// Whether to follow symbolic links while walking directories
    pub follow_symlinks: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            max_inline_bytes: 5 * 1024 * 1024,
            analysis_sample_bytes: 1024 * 1024,
            scan_workers: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2),
            follow_symlinks: false,
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigLoad(format!("Failed to read config file: {}", e)))?;

        serde_json::from_str(&contents)
            .map_err(|e| Error::ConfigLoad(format!("Failed to parse config file: {}", e)))
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::ConfigSave(format!("Failed to create config directory: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| Error::ConfigSave(format!("Failed to write config file: {}", e)))
    }

    /// Load configuration from the default location, falling back to defaults.
    pub fn load_or_default() -> Self {
        let config_path = Self::default_config_path();

        if config_path.exists() {
            match Self::load(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    log::warn!("Failed to load config, using defaults: {}", e);
                }
            }
        }

        Self::default()
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        Self::data_dir().join("config.json")
    }

    /// Get the application data directory.
    ///
    /// `FERROSCAN_DATA_DIR` overrides the platform default.
    pub fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var("FERROSCAN_DATA_DIR") {
            return PathBuf::from(dir);
        }

        dirs::data_local_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("ferroscan")
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.scan.max_inline_bytes == 0 {
            return Err(Error::ConfigInvalid {
                field: "scan.max_inline_bytes".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.scan.analysis_sample_bytes == 0 {
            return Err(Error::ConfigInvalid {
                field: "scan.analysis_sample_bytes".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        if self.scan.scan_workers == 0 {
            return Err(Error::ConfigInvalid {
                field: "scan.scan_workers".to_string(),
                message: "Must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.default_storage, StorageKind::Json);
    }

    #[test]
    fn test_invalid_worker_count() {
        let mut config = Config::default();
        config.scan.scan_workers = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.default_storage = StorageKind::Sqlite;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.default_storage, StorageKind::Sqlite);
        assert_eq!(loaded.scan.max_inline_bytes, config.scan.max_inline_bytes);
    }
}

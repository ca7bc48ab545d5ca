//! Configuration module for backend selection and on-disk locations
//!
//! This module provides configuration structures for choosing where the
//! history store keeps its data (local files or memory), where extraction
//! scratch directories go, and how much processing history is retained.

use crate::store::DEFAULT_HISTORY_LIMIT;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Data directory used when none is configured
pub const DEFAULT_DATA_DIR: &str = "./colorvault-data";

/// Enumeration of supported key-value backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// One JSON file per key under the data directory
    File,
    /// Process memory; nothing survives a restart
    Memory,
}

/// Configuration for the history store and the extractor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// The key-value backend to use
    pub backend: StoreBackend,
    /// Directory holding the file backend's data (defaults to `./colorvault-data`)
    pub data_dir: Option<PathBuf>,
    /// Root for extraction scratch directories (defaults to the data directory)
    pub scratch_dir: Option<PathBuf>,
    /// Number of processing log entries to keep
    pub history_limit: usize,
}

impl VaultConfig {
    /// File backend in the default data directory
    pub fn default_file() -> Self {
        VaultConfig {
            backend: StoreBackend::File,
            data_dir: None,
            scratch_dir: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    /// In-memory backend, e.g. for tests and dry runs
    pub fn in_memory() -> Self {
        VaultConfig {
            backend: StoreBackend::Memory,
            ..Self::default_file()
        }
    }

    /// File backend rooted at `data_dir`
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        VaultConfig {
            data_dir: Some(data_dir.into()),
            ..Self::default_file()
        }
    }

    /// Parse a store URI
    ///
    /// Supports formats:
    /// - `memory://` for the in-memory backend
    /// - `file:///abs/path`, `/abs/path` or `./relative/path` for the file backend
    pub fn from_uri(uri: &str) -> crate::Result<VaultConfig> {
        if let Some(rest) = uri.strip_prefix("memory://") {
            if !rest.is_empty() {
                return Err(crate::VaultError::validation(format!(
                    "Invalid memory URI '{uri}': memory:// takes no path"
                )));
            }
            return Ok(VaultConfig::in_memory());
        }

        let path = uri.strip_prefix("file://").unwrap_or(uri);
        if path.is_empty() {
            return Err(crate::VaultError::validation(
                "Invalid store URI: missing data directory",
            ));
        }
        Ok(VaultConfig::with_data_dir(path))
    }

    /// Data directory, falling back to [`DEFAULT_DATA_DIR`]
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
    }

    /// Scratch root, falling back to the data directory
    pub fn resolved_scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| self.resolved_data_dir())
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.history_limit == 0 {
            return Err(crate::VaultError::validation(
                "history_limit must be at least 1",
            ));
        }
        if self.backend == StoreBackend::File
            && self.resolved_data_dir().as_os_str().is_empty()
        {
            return Err(crate::VaultError::validation(
                "File backend requires a data directory",
            ));
        }
        Ok(())
    }
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self::default_file()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_file_config() {
        let config = VaultConfig::default_file();
        assert_eq!(config.backend, StoreBackend::File);
        assert!(config.data_dir.is_none());
        assert_eq!(config.history_limit, 50);
        assert_eq!(config.resolved_data_dir(), PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn test_scratch_dir_defaults_to_data_dir() {
        let mut config = VaultConfig::with_data_dir("/var/colorvault");
        assert_eq!(config.resolved_scratch_dir(), PathBuf::from("/var/colorvault"));

        config.scratch_dir = Some(PathBuf::from("/tmp/scratch"));
        assert_eq!(config.resolved_scratch_dir(), PathBuf::from("/tmp/scratch"));
    }

    #[test]
    fn test_from_uri_memory() {
        let config = VaultConfig::from_uri("memory://").unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
    }

    #[test]
    fn test_from_uri_memory_with_path_rejected() {
        assert!(VaultConfig::from_uri("memory://somewhere").is_err());
    }

    #[test]
    fn test_from_uri_file() {
        let config = VaultConfig::from_uri("file:///data/cv").unwrap();
        assert_eq!(config.backend, StoreBackend::File);
        assert_eq!(config.data_dir, Some(PathBuf::from("/data/cv")));

        let config = VaultConfig::from_uri("./local").unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("./local")));
    }

    #[test]
    fn test_from_uri_empty_path() {
        let result = VaultConfig::from_uri("file://");
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("missing data directory"));
        assert!(VaultConfig::from_uri("").is_err());
    }

    #[test]
    fn test_validate() {
        let mut config = VaultConfig::default_file();
        assert!(config.validate().is_ok());

        config.history_limit = 0;
        assert!(config.validate().is_err());

        let mut config = VaultConfig::with_data_dir("");
        assert!(config.validate().is_err());
        config.backend = StoreBackend::Memory;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serde() {
        let config = VaultConfig::in_memory();
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"memory\""));
        let back: VaultConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back.backend, StoreBackend::Memory);
    }
}

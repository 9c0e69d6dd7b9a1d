//! Editor configuration, loaded from RON.
//!
//! Every field has a default, so a config file only needs the keys it wants
//! to change:
//!
//! ```ron
//! (
//!     store: (undo_limit: 50),
//!     database: (title_column_name: "Name"),
//! )
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON parse error: {0}")]
    Ron(#[from] ron::error::SpannedError),
}

/// Top-level configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FolioConfig {
    pub store: StoreConfig,
    pub database: DatabaseConfig,
    pub edgeless: EdgelessConfig,
}

/// Shared document store tuning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Capacity of the change-event broadcast channel. Slow subscribers
    /// that fall further behind than this observe a lag.
    pub event_capacity: usize,
    /// Maximum retained undo checkpoints; the oldest is dropped first.
    pub undo_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
            undo_limit: 100,
        }
    }
}

/// Database block defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Width given to columns created without an explicit width.
    pub default_column_width: f64,
    /// Header label of the title column until renamed.
    pub title_column_name: String,
    /// Width of the title column until resized.
    pub title_column_width: f64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            default_column_width: 200.0,
            title_column_name: "Title".to_string(),
            title_column_width: 432.0,
        }
    }
}

/// Edgeless canvas behavior.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgelessConfig {
    /// Padding added around lifted blocks when a new note wraps them.
    pub note_padding: f64,
    /// Minimum width of a note created by lifting blocks.
    pub min_note_width: f64,
}

impl Default for EdgelessConfig {
    fn default() -> Self {
        Self {
            note_padding: 24.0,
            min_note_width: 240.0,
        }
    }
}

impl FolioConfig {
    /// Parse a RON document.
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Load and parse a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_ron_str(&text)
    }

    /// Load a RON file, falling back to defaults on any error.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!("config not found at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => {
                tracing::info!("loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("failed to load config from {:?}: {}", path, e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = FolioConfig::from_ron_str("(store: (undo_limit: 5))").unwrap();
        assert_eq!(config.store.undo_limit, 5);
        assert_eq!(config.store.event_capacity, 1024);
        assert_eq!(config.database, DatabaseConfig::default());
    }

    #[test]
    fn test_empty_config() {
        let config = FolioConfig::from_ron_str("()").unwrap();
        assert_eq!(config, FolioConfig::default());
    }

    #[test]
    fn test_bad_config_is_error() {
        assert!(matches!(
            FolioConfig::from_ron_str("(store: (undo_limit: \"many\"))"),
            Err(ConfigError::Ron(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("folio.ron");
        std::fs::write(&path, "(database: (title_column_name: \"Name\"))").unwrap();

        let config = FolioConfig::load(&path).unwrap();
        assert_eq!(config.database.title_column_name, "Name");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = FolioConfig::load_or_default(dir.path().join("absent.ron"));
        assert_eq!(config, FolioConfig::default());
    }

    #[test]
    fn test_load_or_default_broken_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.ron");
        std::fs::write(&path, "(((").unwrap();
        assert_eq!(FolioConfig::load_or_default(&path), FolioConfig::default());
    }
}

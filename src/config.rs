//! Configuration settings for the agenda engine.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, Result};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub expansion: ExpansionConfig,
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ConfigError::ReadFile)?;
        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<()> {
        if self.expansion.max_occurrences == 0 {
            return Err(ConfigError::Invalid("expansion.max_occurrences must be > 0".to_string()).into());
        }
        if self.storage.persist && self.storage.data_dir.is_empty() {
            return Err(
                ConfigError::Invalid("storage.data_dir required when persist = true".to_string())
                    .into(),
            );
        }
        Ok(())
    }
}

/// Expansion limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpansionConfig {
    /// Maximum occurrences a single expansion may yield before the range is
    /// rejected as too large.
    pub max_occurrences: usize,
}

impl Default for ExpansionConfig {
    fn default() -> Self {
        Self {
            max_occurrences: crate::schedule::expand::DEFAULT_MAX_OCCURRENCES,
        }
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Whether the embedded store persists to disk.
    pub persist: bool,
    /// Directory for the persistence file.
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            persist: false,
            data_dir: "./data".to_string(),
        }
    }
}

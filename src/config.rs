use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::agents::{PpoConfig, QLearnerConfig};
use crate::error::ConfigError;
use crate::training::SelfPlayConfig;

/// Top-level application configuration, loadable from TOML.
///
/// Every section is optional in the file; missing keys take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub self_play: SelfPlayConfig,
    pub ppo: PpoConfig,
    pub q_learning: QLearnerConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            warn!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.self_play.validate()?;
        self.ppo.validate()?;
        self.q_learning.validate()
    }
}

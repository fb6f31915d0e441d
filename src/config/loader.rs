use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::types::Config;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Returns the path to the configuration file.
    ///
    /// Uses `~/.config/mvi-paging/config.toml` on Unix/macOS,
    /// or equivalent on other platforms via `dirs::config_dir()`.
    /// Falls back to current directory if config_dir is unavailable.
    pub fn config_path() -> PathBuf {
        let config_dir = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        config_dir.join("mvi-paging").join("config.toml")
    }

    /// Loads configuration from the default config file.
    ///
    /// - If the file doesn't exist, returns `Config::default()`.
    /// - If the file exists, parses it as TOML and validates.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path();

        if !path.exists() {
            return Ok(Config::default());
        }

        Self::load_from(&path)
    }

    /// Loads and validates configuration from an explicit path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// Checks:
    /// - The container name is not blank
    /// - The queue warning threshold is positive
    /// - The demo feed has at least one source and a non-zero page size
    /// - `fail_page`, when set, is 1-based
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.container.name.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                message: "container.name must not be empty".to_string(),
            });
        }

        if self.container.queue_warn_threshold == 0 {
            return Err(ConfigError::ValidationError {
                message: "container.queue_warn_threshold must be greater than zero".to_string(),
            });
        }

        if self.demo.sources == 0 {
            return Err(ConfigError::ValidationError {
                message: "demo.sources must be at least 1".to_string(),
            });
        }

        if self.demo.page_size == 0 {
            return Err(ConfigError::ValidationError {
                message: "demo.page_size must be at least 1".to_string(),
            });
        }

        if self.demo.fail_page == Some(0) {
            return Err(ConfigError::ValidationError {
                message: "demo.fail_page is 1-based; 0 never matches a page".to_string(),
            });
        }

        Ok(())
    }
}

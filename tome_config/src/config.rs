use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::settings::{LoaderSettings, LoggingSettings};

/// Main configuration structure for tome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// File loader settings
    #[serde(default)]
    pub loader: LoaderSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Load configuration from TOML string
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> ConfigResult<()> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// Export configuration as TOML string
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get configuration file search paths
    pub fn config_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // User-specific config
        if let Some(home) = std::env::var_os("HOME") {
            paths.push(PathBuf::from(&home).join(".tome").join("config.toml"));
            paths.push(PathBuf::from(&home).join(".config").join("tome").join("config.toml"));
        }

        // System-wide config
        paths.push(PathBuf::from("/etc/tome/config.toml"));

        // Current directory
        if let Ok(current_dir) = std::env::current_dir() {
            paths.push(current_dir.join(".tome.toml"));
            paths.push(current_dir.join("tome.toml"));
        }

        paths
    }

    /// Load configuration with automatic path discovery
    pub fn load() -> ConfigResult<Self> {
        Self::load_with_paths(&Self::config_paths())
    }

    /// Load the first existing file among `paths`, or the defaults.
    pub fn load_with_paths(paths: &[PathBuf]) -> ConfigResult<Self> {
        match paths.iter().find(|path| path.exists()) {
            Some(path) => Self::from_file(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.loader.max_size < -1 {
            return Err(ConfigError::Validation(format!(
                "loader.max_size must be -1 or greater, got {}",
                self.loader.max_size
            )));
        }
        if self.loader.chunk_size == 0 {
            return Err(ConfigError::Validation(
                "loader.chunk_size must be greater than 0".to_string(),
            ));
        }
        if self.logging.level.trim().is_empty() {
            return Err(ConfigError::Validation("logging.level must not be empty".to_string()));
        }
        Ok(())
    }
}

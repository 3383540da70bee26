use serde::{Deserialize, Serialize};

/// File loader settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderSettings {
    /// Largest file that will be loaded, in bytes; -1 disables the limit
    #[serde(default = "default_max_size")]
    pub max_size: i64,
    /// Read size, in bytes
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
}

fn default_max_size() -> i64 {
    50_000_000
}

fn default_chunk_size() -> u64 {
    32 * 1024
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_size: default_max_size(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive, overridden by `RUST_LOG`
    #[serde(default = "default_level")]
    pub level: String,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self { level: default_level() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_defaults() {
        let settings = LoaderSettings::default();
        assert_eq!(settings.max_size, 50_000_000);
        assert_eq!(settings.chunk_size, 32_768);
    }

    #[test]
    fn test_partial_loader_table_uses_defaults() {
        let settings: LoaderSettings = toml::from_str("max_size = -1").unwrap();
        assert_eq!(settings.max_size, -1);
        assert_eq!(settings.chunk_size, 32_768);
    }
}

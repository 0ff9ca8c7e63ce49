//! Configuration file parsing
//!
//! Parses TOML configuration files for the depot server.

use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server settings
    pub server: ServerConfig,

    /// Content store settings
    pub store: StoreConfig,
}

/// Server settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Content store configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    /// File-backed store
    File {
        /// Blob directory path
        path: String,
    },
    /// In-memory store (contents lost on restart)
    Memory,
}

impl Config {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from a string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<(), ConfigError> {
        if self.server.bind.is_empty() {
            return Err(ConfigError::Invalid("server.bind must not be empty".to_string()));
        }

        if let StoreConfig::File { path } = &self.store {
            if path.is_empty() {
                return Err(ConfigError::Invalid(
                    "file store requires a non-empty path".to_string(),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_file_store_config() {
        let config_str = r#"
[server]
bind = "127.0.0.1:9000"
log_level = "debug"

[store]
type = "file"
path = "/data/blobs"
"#;

        let config = Config::parse(config_str).unwrap();
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.server.log_level, "debug");
        assert!(matches!(config.store, StoreConfig::File { ref path } if path == "/data/blobs"));
    }

    #[test]
    fn test_parse_memory_store_config() {
        let config_str = r#"
[server]

[store]
type = "memory"
"#;

        let config = Config::parse(config_str).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.server.log_level, "info");
        assert!(matches!(config.store, StoreConfig::Memory));
    }

    #[test]
    fn test_empty_store_path_error() {
        let config_str = r#"
[server]

[store]
type = "file"
path = ""
"#;

        let result = Config::parse(config_str);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_unknown_store_type_error() {
        let config_str = r#"
[server]

[store]
type = "s3"
bucket = "models"
"#;

        let result = Config::parse(config_str);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}

//! Relay configuration
//!
//! Loads listener settings from an optional TOML file.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default listen address
pub const DEFAULT_BIND: &str = "0.0.0.0";

/// Default listen port
pub const DEFAULT_PORT: u16 = 8080;

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelayConfig {
    /// Address to bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl RelayConfig {
    /// Load configuration from a TOML file
    ///
    /// The path is given explicitly, so a missing file is an error. Missing keys take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: RelayConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Apply command line overrides
    pub fn with_overrides(mut self, bind: Option<String>, port: Option<u16>) -> Self {
        if let Some(bind) = bind {
            self.bind = bind;
        }
        if let Some(port) = port {
            self.port = port;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_load_nonexistent_is_error() {
        let dir = tempdir().unwrap();
        let result = RelayConfig::load(&dir.path().join("relay.tml"));
        assert!(matches!(result, Err(ConfigError::Read(_))));
    }

    #[test]
    fn test_load_empty_file_returns_default() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        fs::write(&path, "").unwrap();

        let config = RelayConfig::load(&path).unwrap();
        assert_eq!(config, RelayConfig::default());
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        fs::write(&path, "port = 9100\n").unwrap();

        let config = RelayConfig::load(&path).unwrap();
        assert_eq!(config.port, 9100);
        assert_eq!(config.bind, DEFAULT_BIND);
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        fs::write(&path, "bind = \"127.0.0.1\"\nport = 7000\n").unwrap();

        let config = RelayConfig::load(&path).unwrap();
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.port, 7000);
    }

    #[test]
    fn test_parse_invalid_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("relay.toml");
        fs::write(&path, "port = \"not a number\"").unwrap();

        let result = RelayConfig::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_overrides() {
        let config = RelayConfig::default().with_overrides(None, Some(9000));
        assert_eq!(config.bind, DEFAULT_BIND);
        assert_eq!(config.port, 9000);

        let config =
            RelayConfig::default().with_overrides(Some("127.0.0.1".to_string()), None);
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.port, DEFAULT_PORT);
    }
}

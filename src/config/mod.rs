//! Configuration management for salon
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use salon::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Server listening on: {}", config.server.bind_addr);
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `SALON__<section>__<key>`
//!
//! Examples:
//! - `SALON__SERVER__BIND_ADDR=0.0.0.0:9000`
//! - `SALON__KIE__BASE_URL=https://api.kie.ai`
//! - `SALON__GENERATION__MIRROR_RESULTS=false`
//!
//! Secrets (`KIE_API_KEY`, `S3_ACCESS_KEY`/`S3_SECRET_KEY` or the AWS
//! variable names) are read from the environment only and never from the
//! TOML file.
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/salon.toml`.
//! This can be overridden using the `SALON_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use models::{
    ApiLimits, Config, GenerationConfig, KieConfig, ServerConfig, StorageConfig, StorageProvider,
};
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// Configuration is loaded with the following priority (highest to lowest):
    /// 1. Environment variables (`SALON__*`)
    /// 2. TOML file (default: `config/salon.toml`)
    /// 3. Default values
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file is malformed or
    /// validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_load_minimal_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[storage]
cdn_url = "https://cdn.salon.test"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();
        assert_eq!(config.storage.cdn_url, "https://cdn.salon.test");
        assert_eq!(config.kie.base_url, "https://api.kie.ai");
    }

    #[test]
    fn test_validation_catches_bad_cdn_url() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[storage]
cdn_url = "not a url"
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let result = Config::load_from_path(config_path);
        assert!(matches!(
            result,
            Err(ConfigError::ValidationError(
                ValidationError::InvalidCdnUrl(_)
            ))
        ));
    }

    #[test]
    fn test_full_config_example() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test.toml");

        let toml_content = r#"
[server]
bind_addr = "0.0.0.0:8080"
ledger_path = "data/ledger"

[storage]
provider = "local"
bucket = "salon-assets"
local_path = "data/objects"
cdn_url = "https://cdn.salon.test"

[kie]
base_url = "https://api.kie.ai"
callback_url = "https://api.salon.test/webhooks/kie-image"

[generation]
mirror_results = true
        "#;

        fs::write(&config_path, toml_content).unwrap();

        let config = Config::load_from_path(config_path).unwrap();

        assert_eq!(config.server.bind_addr.to_string(), "0.0.0.0:8080");
        assert_eq!(config.storage.provider, StorageProvider::Local);
        assert!(config.generation.mirror_results);
        assert!(config.kie.callback_url.is_some());
    }
}

// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # reveal Configuration System
//!
//! Type-safe configuration for the reveal orchestrator with support for:
//! - TOML file parsing
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! ## Usage
//!
//! ```rust,no_run
//! use reveal_config::{load_config, validate_config};
//!
//! let config = load_config(None, None).expect("Failed to load config");
//! validate_config(&config).expect("Invalid config");
//!
//! println!("Cooldown: {} ms", config.queue.cooldown_ms);
//! println!("Universe: {}", config.data.universe_path.display());
//! ```
//!
//! Durations are stored as integer milliseconds so the TOML file stays flat;
//! the helpers on each section convert them to [`std::time::Duration`].

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration file name searched for by [`find_config_file`]
pub const CONFIG_FILE_NAME: &str = "reveal_configuration.toml";

pub mod loader;
pub mod types;
pub mod validation;

pub use loader::{apply_cli_overrides, apply_environment_overrides, find_config_file, load_config};
pub use types::*;
pub use validation::{validate_config, ConfigValidationError};

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found. Searched: {0}")]
    FileNotFound(String),

    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax: {0}")]
    ParseError(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = RevealConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_empty_file_is_all_defaults() {
        let config: RevealConfig = toml::from_str("").unwrap();
        assert_eq!(config.queue.cooldown_ms, QueueConfig::default().cooldown_ms);
        assert!(!config.route.enabled);
    }
}

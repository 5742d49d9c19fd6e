//! Error types for the settings crate.
//!
//! Loading errors (unreadable or unparsable files) live here. Validation
//! errors are `ampes_core::ConfigError` and convert into `SettingsError`.

use std::io;
use thiserror::Error;

pub use ampes_core::ConfigError;

/// Errors that can occur while loading a configuration file.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    IoError(#[from] io::Error),

    /// JSON deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// TOML deserialization error.
    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// YAML deserialization error.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// The configuration file extension is not supported.
    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    /// A configuration validation error occurred.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<SettingsError> for ampes_core::Error {
    fn from(err: SettingsError) -> Self {
        match err {
            SettingsError::Config(e) => ampes_core::Error::Config(e),
            SettingsError::IoError(e) => ampes_core::Error::Io(e),
            other => ampes_core::Error::other(other.to_string()),
        }
    }
}

/// Result type alias for settings operations.
pub type SettingsResult<T> = Result<T, SettingsError>;

/// Result type alias for configuration validation.
pub type ConfigResult<T> = Result<T, ConfigError>;

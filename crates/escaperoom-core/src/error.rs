//! Core error types for escaperoom-core.
//!
//! The puzzle state machines themselves never fail: rejected input and
//! repeated transitions are reported through return values. These errors
//! cover the ambient surface around them (configuration files, presenter
//! sinks) using thiserror.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for escaperoom-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Config directory could not be resolved or created
    #[error("Configuration directory unavailable: {0}")]
    DirUnavailable(String),

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    /// Access code has the wrong shape
    #[error("Access code must be exactly {width} ASCII digits, got '{code}'")]
    InvalidAccessCode { code: String, width: usize },

    /// Wrong number of sectors
    #[error("Expected exactly {expected} sectors, found {found}")]
    SectorCount { expected: usize, found: usize },

    /// Empty collection
    #[error("Empty value: {0}")]
    Empty(String),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },
}

/// Failure reported by a presentation or audio sink.
///
/// Never fatal: the session logs it and carries on with the transition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PresentError {
    /// Output device rejected the write
    #[error("Presentation sink unavailable: {0}")]
    Unavailable(String),

    /// Playback refused by the environment
    #[error("Audio playback rejected: {0}")]
    PlaybackRejected(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for CoreError {
    fn from(err: toml::ser::Error) -> Self {
        CoreError::Custom(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

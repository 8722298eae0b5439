//! Core error types for lessonflow-core.
//!
//! Catalog problems are configuration errors raised once, when a scheduler is
//! built. Nothing inside a running session fails; the only runtime rejection
//! is a manual jump to a stage that does not exist.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for lessonflow-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML serialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// Configuration-specific errors.
///
/// The catalog variants describe a malformed stage catalog. A lesson must not
/// start with one of these outstanding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Catalog has no stages
    #[error("Stage catalog is empty")]
    EmptyCatalog,

    /// A stage id is blank
    #[error("Stage at position {position} has an empty id")]
    EmptyStageId { position: usize },

    /// Two stages share an id
    #[error("Duplicate stage id '{id}'")]
    DuplicateStageId { id: String },

    /// A stage duration is zero, negative or not finite
    #[error("Stage '{id}' has non-positive duration {duration_min} min")]
    NonPositiveDuration { id: String, duration_min: f64 },

    /// Stage durations do not add up to the declared standard total
    #[error("Stage durations sum to {sum_min} min but the catalog declares {declared_min} min")]
    TotalMismatch { declared_min: f64, sum_min: f64 },

    /// Compressed total is shorter than a second or not below the standard total
    #[error("Compressed total {compressed_min} min must last at least one second and stay below the standard total {standard_min} min")]
    InvalidCompressedTotal { standard_min: f64, compressed_min: f64 },

    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Out of bounds
    #[error("Index {index} out of bounds for {collection} (length: {len})")]
    OutOfBounds {
        collection: String,
        index: usize,
        len: usize,
    },
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

impl From<toml::de::Error> for CoreError {
    fn from(err: toml::de::Error) -> Self {
        CoreError::Config(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

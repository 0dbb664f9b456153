//! Error types for sitediag

use thiserror::Error;

/// Result type alias for sitediag operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Invalid probe identity: {0}")]
    InvalidIdentity(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Interactive prompt error: {0}")]
    Dialoguer(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

impl From<dialoguer::Error> for Error {
    fn from(err: dialoguer::Error) -> Self {
        Error::Dialoguer(err.to_string())
    }
}

/// Transient store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Could not determine the user cache directory")]
    NoHome,

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Cache database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Cache TTL must be greater than zero (at least 1 ms)")]
    InvalidTtl,

    #[error("Malformed cache entry: {0}")]
    Malformed(String),
}

/// Failures raised by a probe's own check logic.
///
/// These never escape the probe runner; they are rendered as the probe's
/// finding instead.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),
}

impl From<reqwest::Error> for ProbeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProbeError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ProbeError::Network("Failed to connect".to_string())
        } else {
            ProbeError::Network(err.to_string())
        }
    }
}

impl From<rusqlite::Error> for ProbeError {
    fn from(err: rusqlite::Error) -> Self {
        ProbeError::Database(err.to_string())
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `sitediag init` to set up.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

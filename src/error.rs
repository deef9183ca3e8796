//! Error types for the fedcorpus crate

use thiserror::Error;

/// Result type for fedcorpus operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for fedcorpus operations
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid run configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Listing discovery error
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Document fetch error
    #[error("Fetch error: {0}")]
    Fetch(String),

    /// Ledger storage error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Other errors
    #[error("{0}")]
    Other(String),
}

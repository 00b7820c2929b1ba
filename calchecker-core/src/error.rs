//! Error types for calchecker.

use thiserror::Error;

/// Errors that can occur during a check run.
#[derive(Error, Debug)]
pub enum CalCheckerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// `host` is the feed origin only; feed paths often embed access tokens.
    #[error("Calendar feed at {host} returned HTTP {status}")]
    HttpStatus {
        status: reqwest::StatusCode,
        host: String,
    },

    #[error("ICS parse error: {0}")]
    IcsParse(String),

    #[error("Invalid encryption key: {0}")]
    InvalidKey(String),

    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for calchecker operations.
pub type CalCheckerResult<T> = Result<T, CalCheckerError>;

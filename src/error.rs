//! Custom error types for collabmap.
//!
//! Library functions return `Result<T, CollabError>`. Most remote failures are
//! logged and skipped by the callers, so these errors rarely reach `main`.

use thiserror::Error;

/// Main error type for collabmap operations.
#[derive(Debug, Error)]
pub enum CollabError {
    /// Network/HTTP request error (includes client-side timeouts)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// External API returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Error message
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("Parse error: {0}")]
    Parse(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Config error: {0}")]
    Config(String),
}

/// Result type alias using `CollabError`
pub type Result<T> = std::result::Result<T, CollabError>;

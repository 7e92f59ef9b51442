//! Embedding client error types.

use thiserror::Error;

/// Result type for ML client operations.
pub type MlResult<T> = Result<T, MlError>;

/// Errors from the embedding service client.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("Embedding service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Embedding service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Malformed embedding response: {0}")]
    BadResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

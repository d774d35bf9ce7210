//! Error types for the sync client.

use flipdot_core::DocumentError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur when talking to the flipdot server.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The configured base URL is invalid.
    #[error("invalid server URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// JSON parsing failed unexpectedly.
    #[error("failed to parse server payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The server refused the request.
    #[error("server rejected request ({status}): {message}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Server-provided reason.
        message: String,
    },
    /// The server sent a document that does not validate.
    #[error("invalid document from server: {0}")]
    Document(#[from] DocumentError),
}

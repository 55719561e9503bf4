//! Collaborator error types.

use thiserror::Error;

/// Errors that can occur when talking to an upload or submission backend.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    /// Authentication failed (missing or invalid API token).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The backend returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The backend answered with something we could not read.
    #[error("unexpected response: {0}")]
    InvalidResponse(String),

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),

    /// The local draft directory could not be read or written.
    #[error("draft storage I/O error: {0}")]
    Storage(#[from] std::io::Error),
}

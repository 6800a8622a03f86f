//! Error types for upstream client operations

use thiserror::Error;

/// Result type for upstream client operations
pub type Result<T> = std::result::Result<T, UpstreamError>;

/// Errors reported by an upstream client implementation
#[derive(Debug, Error)]
pub enum UpstreamError {
    /// The service answered with an error status
    #[error("{method} {url}: {status} {body}")]
    Status {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    /// The request never produced a response (connection, TLS, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be decoded into the expected entity
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The client could not be constructed or authenticated
    #[error("client unavailable: {0}")]
    Unavailable(String),

    /// Any other failure reported by the client implementation
    #[error("{0}")]
    Other(String),
}

impl UpstreamError {
    /// HTTP status code attached to the error, if the service answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Raw response body attached to the error, if any.
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Status { body, .. } => Some(body),
            _ => None,
        }
    }
}

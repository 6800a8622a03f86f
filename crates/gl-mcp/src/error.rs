//! Error types for the MCP server

use std::num::ParseIntError;

use gl_upstream::UpstreamError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type alias for MCP server operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while serving MCP requests
#[derive(Debug, Error)]
pub enum Error {
    /// No tool is registered under this name
    #[error("tool '{0}' not found")]
    UnknownTool(String),

    /// No resource template matches this URI
    #[error("resource '{0}' not found")]
    UnknownResource(String),

    /// Request parameters did not match the method's shape
    #[error("invalid params: {0}")]
    InvalidParams(String),

    /// A resource handler failed
    #[error(transparent)]
    Handler(#[from] HandlerError),

    /// Catalog assembly failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Configuration could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Error during JSON serialization/deserialization
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The tracing subscriber could not be installed
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// Failures raised inside a tool or resource handler.
///
/// The first four variants are argument failures: they are always raised
/// before the client accessor is invoked. Everything else belongs to the
/// upstream phase of a call.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("missing required parameter: {0}")]
    MissingParameter(String),

    #[error("parameter {name} is not of type {expected}, is {actual}")]
    TypeMismatch {
        name: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid {entity} ID: {source}")]
    InvalidIdentifier {
        entity: &'static str,
        source: ParseIntError,
    },

    /// A resource URI variable is not valid percent-encoded UTF-8
    #[error("invalid percent-encoding in {name}: {value}")]
    InvalidEncoding { name: String, value: String },

    #[error("failed to get GitLab client: {0}")]
    ClientUnavailable(#[source] UpstreamError),

    #[error("failed to {operation}: {source}")]
    Upstream {
        operation: &'static str,
        source: UpstreamError,
    },

    /// The upstream answered, but not with the status the operation expects
    #[error("failed to {operation}: {body}")]
    UnexpectedStatus {
        operation: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to marshal response: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to decode file content: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("request cancelled")]
    Cancelled,
}

impl HandlerError {
    /// Wrap an upstream error, annotated with the operation that failed.
    pub fn upstream(operation: &'static str) -> impl FnOnce(UpstreamError) -> Self {
        move |source| Self::Upstream { operation, source }
    }

    /// Whether this error was raised while validating arguments.
    pub fn is_argument_error(&self) -> bool {
        matches!(
            self,
            Self::MissingParameter(_)
                | Self::TypeMismatch { .. }
                | Self::InvalidIdentifier { .. }
                | Self::InvalidEncoding { .. }
        )
    }

    /// Short machine-readable kind, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingParameter(_) => "missing_parameter",
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::InvalidIdentifier { .. } => "invalid_identifier",
            Self::InvalidEncoding { .. } => "invalid_encoding",
            Self::ClientUnavailable(_) => "client_unavailable",
            Self::Upstream { .. } => "upstream_failure",
            Self::UnexpectedStatus { .. } => "unexpected_status",
            Self::Serialization(_) => "serialization_failure",
            Self::Decode(_) => "decode_failure",
            Self::NotFound(_) => "not_found",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Errors raised while assembling the catalog
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("duplicate tool name: {0}")]
    DuplicateTool(String),

    #[error("duplicate resource template: {0}")]
    DuplicateResource(String),

    #[error("invalid URI template {template}: {reason}")]
    InvalidTemplate { template: String, reason: String },
}

//! Request validation errors.

use thiserror::Error;

/// Errors raised while turning an inbound draft into an [`InvocationRequest`](crate::InvocationRequest).
///
/// These are rejected before the decision pipeline runs; a malformed request
/// is never silently defaulted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// A required field was absent or empty.
    #[error("malformed request: missing {0}")]
    MissingField(&'static str),

    /// The HTTP verb is not one the gateway understands.
    #[error("malformed request: unsupported HTTP verb '{0}'")]
    InvalidVerb(String),

    /// The target path is not an absolute path.
    #[error("malformed request: path '{0}' must start with '/'")]
    InvalidPath(String),
}

/// Result type for request validation.
pub type RequestResult<T> = Result<T, RequestError>;

use warden_approval::ApprovalError;
use warden_config::ConfigError;
use warden_core::{RequestError, ResourceId};

/// Errors that abort a gateway operation.
///
/// A decision that fails with one of these never executes anything.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The inbound request could not be turned into an invocation.
    #[error("malformed request: {0}")]
    MalformedRequest(#[from] RequestError),

    /// No configuration exists for the requested resource.
    #[error("unknown resource: {0}")]
    UnknownResource(ResourceId),

    /// A configuration update was rejected.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// A human-decision or replay operation was refused.
    #[error(transparent)]
    Approval(#[from] ApprovalError),

    /// An internal component failed (audit storage, mismatched records).
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Failure reported by an upstream executor.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("upstream call failed: {0}")]
pub struct UpstreamError(pub String);

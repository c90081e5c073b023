use std::time::Duration;

/// Reasons the risk reviewer could not produce a usable verdict.
///
/// None of these reach the caller of the decision pipeline: each one is
/// turned into the configured fallback verdict.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReviewError {
    /// The reviewer did not answer within the configured timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The decision was cancelled while the review was in flight.
    #[error("cancelled")]
    Cancelled,

    /// The reviewer could not be reached or answered with an error status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The reviewer answered with a body that does not decode to a verdict.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// Result type for review operations.
pub type ReviewResult<T> = Result<T, ReviewError>;

/// The review gateway's error type under its pipeline name.
pub type ReviewUnavailable = ReviewError;

use chrono::{DateTime, Utc};
use warden_core::ApprovalId;

use crate::store::ApprovalStatus;

/// Errors returned by the approval state machine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApprovalError {
    /// No approval record with this id.
    #[error("approval {id} not found")]
    NotFound {
        /// The requested id.
        id: ApprovalId,
    },

    /// The record is not in a state that permits the requested transition.
    #[error("approval {id} is already {current}")]
    Conflict {
        /// The record id.
        id: ApprovalId,
        /// The status the record is actually in.
        current: ApprovalStatus,
    },

    /// The record is still PENDING but its expiry has passed.
    #[error("approval {id} expired at {expires_at}")]
    Expired {
        /// The record id.
        id: ApprovalId,
        /// When the record expired.
        expires_at: DateTime<Utc>,
    },

    /// The approved request was already replayed.
    #[error("approval {id} was already replayed")]
    AlreadyReplayed {
        /// The record id.
        id: ApprovalId,
    },
}

/// Result type for approval operations.
pub type ApprovalResult<T> = Result<T, ApprovalError>;

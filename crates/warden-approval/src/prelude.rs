//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_approval::prelude::*;` to import all essential types.

// Errors
pub use crate::{ApprovalError, ApprovalResult};

// Policy
pub use crate::{POLICY_CHECK_ORDER, PolicyCheck, PolicyEngine, PolicyResult, Violation};

// Rate limiting
pub use crate::RateLimiter;

// Approvals
pub use crate::{ApprovalRecord, ApprovalStatus, ApprovalStore, ExpirySweeper, HumanDecision};

//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_audit::prelude::*;` to import all essential types.

// Errors
pub use crate::{AuditError, AuditResult};

// Log and storage
pub use crate::{AuditLog, AuditStorage, MemoryAuditStorage};

// Records
pub use crate::{
    ApprovalOutcome, AuditRecord, ExecutionResult, PolicyOutcome, ReviewOutcome, StageLatency,
};

//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_core::prelude::*;` to import all essential types.

// Errors
pub use crate::{RequestError, RequestResult};

// Identifiers
pub use crate::{ApprovalId, AuditRecordId, ResourceId};

// Requests
pub use crate::{ArgumentSchema, Classification, FieldType, HttpVerb, InvocationRequest};

// Risk review
pub use crate::{Outcome, RiskDecision, RiskVerdict};

// Time
pub use crate::{Clock, SystemClock};

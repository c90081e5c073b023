//! Warden Audit - Append-only audit trail of gating decisions.
//!
//! Every invocation attempt produces exactly one [`AuditRecord`] holding the
//! policy, review, and approval stage outcomes, the final outcome with its
//! reasons, and per-stage latency. Arguments are stored redacted.
//!
//! Records are immutable once written, with one exception: the execution
//! result may be attached exactly once via [`AuditLog::attach_execution`].
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use warden_audit::{AuditLog, AuditRecord, ExecutionResult, PolicyOutcome};
//! use warden_core::{HttpVerb, InvocationRequest, Outcome};
//!
//! let log = AuditLog::in_memory();
//! let request = InvocationRequest::new("shop", "listOrders", HttpVerb::Get, "/orders");
//! let policy = PolicyOutcome {
//!     allowed: true,
//!     requires_approval: false,
//!     violations: vec![],
//!     evaluated: vec!["enabled".to_string()],
//!     config_version: 0,
//! };
//! let record = AuditRecord::new(&request, policy, Outcome::Allow, vec!["ok".into()], Utc::now());
//! let id = log.record(&record).unwrap();
//!
//! log.attach_execution(&id, ExecutionResult::Executed { summary: "200".into() }, Utc::now())
//!     .unwrap();
//! assert!(log.attach_execution(&id, ExecutionResult::Executed { summary: "200".into() }, Utc::now()).is_err());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod log;
mod record;
mod storage;

pub use error::{AuditError, AuditResult};
pub use log::AuditLog;
pub use record::{
    ApprovalOutcome, AuditRecord, ExecutionRecord, ExecutionResult, PolicyOutcome, ReviewOutcome,
    StageLatency,
};
pub use storage::{AuditStorage, MemoryAuditStorage};

//! Warden Core - Foundation types for the Warden request-gating gateway.
//!
//! This crate provides:
//! - The immutable [`InvocationRequest`] value and its validated construction
//! - Identifier newtypes for resources, approvals, and audit records
//! - The three-way [`RiskDecision`] and the [`RiskVerdict`] produced by risk review
//! - A [`Clock`] abstraction so time-dependent logic can be driven by tests
//! - Argument redaction helpers used before anything leaves the process
//! - Upstream host classification for the domain lock
//!
//! # Example
//!
//! ```
//! use warden_core::{Classification, HttpVerb, InvocationRequest};
//!
//! let request = InvocationRequest::new("billing", "createInvoice", HttpVerb::Post, "/invoices")
//!     .with_classification(Classification::Write)
//!     .with_caller("agent-7");
//!
//! assert_eq!(request.verb(), HttpVerb::Post);
//! assert_eq!(request.rate_limit_key(), "agent-7");
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod clock;
pub mod error;
pub mod ids;
pub mod net;
pub mod outcome;
pub mod redact;
pub mod request;
pub mod verdict;

pub use clock::{Clock, SystemClock};
pub use error::{RequestError, RequestResult};
pub use ids::{ApprovalId, AuditRecordId, ResourceId};
pub use net::{HostRejection, check_upstream_host, is_public_ip};
pub use outcome::Outcome;
pub use redact::{REDACTED, RedactedArguments, is_secret_key, redact_arguments, scrub_text};
pub use request::{
    ArgumentSchema, Classification, FieldType, HttpVerb, InvocationDraft, InvocationRequest,
};
pub use verdict::{MAX_RISK_SCORE, RiskDecision, RiskVerdict};

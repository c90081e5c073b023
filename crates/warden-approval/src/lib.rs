//! Warden Approval - Deterministic policy and the human-approval lifecycle.
//!
//! This crate provides:
//! - [`RateLimiter`]: per `(resource, caller)` fixed-window counters
//! - [`PolicyEngine`]: the ordered deterministic checks ([`POLICY_CHECK_ORDER`])
//! - [`ApprovalStore`]: the PENDING → APPROVED / REJECTED / EXPIRED state machine
//! - [`ExpirySweeper`]: background task that expires overdue approvals
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use std::sync::Arc;
//! use warden_approval::{PolicyCheck, PolicyEngine, RateLimiter};
//! use warden_config::PolicyConfig;
//! use warden_core::{HttpVerb, InvocationRequest};
//!
//! let engine = PolicyEngine::new(Arc::new(RateLimiter::new()));
//! let config = PolicyConfig::new("https://api.shop.example", [HttpVerb::Get]);
//!
//! let request = InvocationRequest::new("shop", "deleteOrder", HttpVerb::Delete, "/orders/1");
//! let result = engine.evaluate(&request, &config, Utc::now());
//!
//! assert!(!result.allowed);
//! assert_eq!(result.violations[0].check, PolicyCheck::VerbPath);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

/// Error types and results for the approval module.
pub mod error;
pub mod policy;
pub mod rate_limit;
pub mod store;
pub mod sweeper;

pub use error::{ApprovalError, ApprovalResult};
pub use policy::{POLICY_CHECK_ORDER, PolicyCheck, PolicyEngine, PolicyResult, Violation};
pub use rate_limit::{RateDecision, RateLimiter};
pub use store::{ApprovalRecord, ApprovalStatus, ApprovalStore, HumanDecision};
pub use sweeper::ExpirySweeper;

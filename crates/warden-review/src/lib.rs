//! Warden Review - The risk reviewer gateway.
//!
//! This crate provides:
//! - [`RiskReviewer`]: the seam to an external risk assessment service
//! - [`HttpRiskReviewer`]: a JSON-over-HTTP reviewer built on `reqwest`
//! - [`ReviewGateway`]: timeout, cancellation, strict decoding and fallback
//! - [`resolve_decision`]: pure mapping of a verdict onto [`RiskThresholds`]
//!
//! [`RiskThresholds`]: warden_config::RiskThresholds
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use warden_review::{DecodedReview, decode_review, resolve_decision};
//! use warden_config::RiskThresholds;
//! use warden_core::RiskDecision;
//!
//! let raw = json!({"decision": "ALLOW", "riskScore": 50, "reasons": ["large order"]});
//! let DecodedReview::Valid(verdict) = decode_review(&raw) else {
//!     panic!("valid response");
//! };
//!
//! let thresholds = RiskThresholds::new(30, 31, 71).unwrap();
//! assert_eq!(resolve_decision(&verdict, &thresholds), RiskDecision::RequireApproval);
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

pub mod context;
pub mod decode;
/// Error types for the review gateway.
pub mod error;
pub mod gateway;
pub mod resolve;
pub mod reviewer;

pub use context::ReviewContext;
pub use decode::{DecodedReview, decode_review};
pub use error::{ReviewError, ReviewResult, ReviewUnavailable};
pub use gateway::{Assessment, FALLBACK_RISK_SCORE, ReviewGateway, fallback_verdict};
pub use resolve::resolve_decision;
pub use reviewer::{HttpRiskReviewer, RiskReviewer};

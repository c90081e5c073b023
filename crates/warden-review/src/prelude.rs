//! Prelude module - commonly used types for convenient import.
//!
//! Use `use warden_review::prelude::*;` to import all essential types.

// Errors
pub use crate::{ReviewError, ReviewResult, ReviewUnavailable};

// Reviewers
pub use crate::{HttpRiskReviewer, ReviewContext, RiskReviewer};

// Gateway
pub use crate::{Assessment, FALLBACK_RISK_SCORE, ReviewGateway, fallback_verdict};

// Decoding and resolution
pub use crate::{DecodedReview, decode_review, resolve_decision};

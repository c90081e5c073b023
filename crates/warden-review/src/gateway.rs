//! Bounded risk review with a safe fallback.
//!
//! The reviewer call is the only suspension point of a decision. It is raced
//! against the configured timeout and the decision's cancellation token; any
//! failure becomes a [`ReviewError`] and the caller applies the fallback.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use warden_config::RiskReviewConfig;
use warden_core::{InvocationRequest, RiskDecision, RiskVerdict};

use crate::context::ReviewContext;
use crate::decode::{DecodedReview, decode_review};
use crate::error::{ReviewError, ReviewUnavailable};
use crate::resolve::resolve_decision;
use crate::reviewer::RiskReviewer;

/// Score attached to every fallback verdict.
pub const FALLBACK_RISK_SCORE: u8 = 75;

/// The verdict used when no reviewer verdict is available.
#[must_use]
pub fn fallback_verdict(decision: RiskDecision, cause: &ReviewError) -> RiskVerdict {
    RiskVerdict::new(
        decision,
        i64::from(FALLBACK_RISK_SCORE),
        vec![format!("risk review unavailable: {cause}")],
    )
}

/// Result of one review round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    /// The verdict that was used: the reviewer's or the fallback.
    pub verdict: RiskVerdict,
    /// Decision after threshold resolution. For a fallback this is the
    /// fallback decision itself.
    pub resolved: RiskDecision,
    /// Why the fallback was used, if it was.
    pub fallback_cause: Option<ReviewError>,
    /// Wall-clock time spent in the review.
    pub elapsed: Duration,
}

impl Assessment {
    /// Whether the fallback verdict was applied.
    #[must_use]
    pub fn fallback_used(&self) -> bool {
        self.fallback_cause.is_some()
    }
}

/// Wraps a [`RiskReviewer`] with timeout, cancellation and strict decoding.
#[derive(Clone)]
pub struct ReviewGateway {
    reviewer: Arc<dyn RiskReviewer>,
}

impl std::fmt::Debug for ReviewGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReviewGateway")
            .field("reviewer", &self.reviewer.name())
            .finish()
    }
}

impl ReviewGateway {
    /// Create a gateway around a reviewer.
    #[must_use]
    pub fn new(reviewer: Arc<dyn RiskReviewer>) -> Self {
        Self { reviewer }
    }

    /// Name of the wrapped reviewer.
    #[must_use]
    pub fn reviewer_name(&self) -> &str {
        self.reviewer.name()
    }

    /// Run one review of `request`.
    ///
    /// The reviewer sees only the redacted [`ReviewContext`]. Secret values
    /// are also scrubbed from the returned reasons.
    ///
    /// # Errors
    ///
    /// Returns [`ReviewError::Timeout`] or [`ReviewError::Cancelled`] when the
    /// call does not finish in time, the reviewer's own error when it fails,
    /// and [`ReviewError::InvalidResponse`] when the answer does not decode.
    pub async fn review(
        &self,
        request: &InvocationRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<RiskVerdict, ReviewUnavailable> {
        let context = ReviewContext::from_request(request);

        // `None` = cancelled via token, `Some(Err(_))` = timed out.
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = tokio::time::timeout(timeout, self.reviewer.review(&context)) => Some(result),
        };

        let raw = match outcome {
            None => return Err(ReviewError::Cancelled),
            Some(Err(_elapsed)) => return Err(ReviewError::Timeout(timeout)),
            Some(Ok(result)) => result?,
        };

        match decode_review(&raw) {
            DecodedReview::Valid(verdict) => Ok(verdict.redacted(context.secrets())),
            DecodedReview::Invalid(reason) => Err(ReviewError::InvalidResponse(reason)),
        }
    }

    /// Review `request` under `config` and resolve the decision.
    ///
    /// Never fails: an unavailable review yields the configured fallback
    /// decision with [`FALLBACK_RISK_SCORE`], without threshold resolution.
    pub async fn assess(
        &self,
        request: &InvocationRequest,
        config: &RiskReviewConfig,
        cancel: &CancellationToken,
    ) -> Assessment {
        let started = Instant::now();
        let result = self.review(request, config.timeout(), cancel).await;
        let elapsed = started.elapsed();

        match result {
            Ok(verdict) => {
                let resolved = resolve_decision(&verdict, &config.thresholds);
                debug!(
                    reviewer = self.reviewer_name(),
                    decision = %verdict.decision,
                    score = verdict.risk_score,
                    resolved = %resolved,
                    "risk review complete"
                );
                Assessment {
                    verdict,
                    resolved,
                    fallback_cause: None,
                    elapsed,
                }
            },
            Err(cause) => {
                warn!(
                    reviewer = self.reviewer_name(),
                    error = %cause,
                    fallback = %config.fallback,
                    "risk review unavailable, applying fallback"
                );
                Assessment {
                    verdict: fallback_verdict(config.fallback, &cause),
                    resolved: config.fallback,
                    fallback_cause: Some(cause),
                    elapsed,
                }
            },
        }
    }
}

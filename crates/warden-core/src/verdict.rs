//! Risk decisions and verdicts.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::redact::scrub_text;

/// Upper bound of the risk score scale.
pub const MAX_RISK_SCORE: u8 = 100;

/// Reason used when a reviewer returns no reasons at all.
const NO_REASON_GIVEN: &str = "reviewer gave no reason";

/// The three-way decision a risk review can reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskDecision {
    /// Execute without human involvement.
    Allow,
    /// Hold for a human decision.
    RequireApproval,
    /// Never execute.
    Block,
}

impl fmt::Display for RiskDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Allow => write!(f, "ALLOW"),
            Self::RequireApproval => write!(f, "REQUIRE_APPROVAL"),
            Self::Block => write!(f, "BLOCK"),
        }
    }
}

impl FromStr for RiskDecision {
    type Err = String;

    /// Strict parse: only the three canonical spellings are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ALLOW" => Ok(Self::Allow),
            "REQUIRE_APPROVAL" => Ok(Self::RequireApproval),
            "BLOCK" => Ok(Self::Block),
            other => Err(format!("unknown decision '{other}'")),
        }
    }
}

/// Output of the risk reviewer gateway.
///
/// The score is always within `0..=100` and `reasons` is never empty; both
/// are enforced by [`RiskVerdict::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskVerdict {
    /// The reviewer's decision.
    pub decision: RiskDecision,
    /// Risk score in `0..=100`.
    pub risk_score: u8,
    /// Ordered, non-empty list of reasons.
    pub reasons: Vec<String>,
    /// Optional hints for making the request acceptable.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggested_changes: Vec<String>,
}

impl RiskVerdict {
    /// Create a verdict, clamping the score into range and ensuring at least one reason.
    #[must_use]
    pub fn new(
        decision: RiskDecision,
        risk_score: i64,
        reasons: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut reasons: Vec<String> = reasons.into_iter().collect();
        if reasons.is_empty() {
            reasons.push(NO_REASON_GIVEN.to_string());
        }
        Self {
            decision,
            risk_score: clamp_score(risk_score),
            reasons,
            suggested_changes: Vec::new(),
        }
    }

    /// Attach suggested-change hints.
    #[must_use]
    pub fn with_suggested_changes(mut self, changes: impl IntoIterator<Item = String>) -> Self {
        self.suggested_changes.extend(changes);
        self
    }

    /// Copy of this verdict with every occurrence of the given secret values
    /// scrubbed from its free-text fields.
    #[must_use]
    pub fn redacted(&self, secrets: &[String]) -> Self {
        Self {
            decision: self.decision,
            risk_score: self.risk_score,
            reasons: self.reasons.iter().map(|r| scrub_text(r, secrets)).collect(),
            suggested_changes: self
                .suggested_changes
                .iter()
                .map(|s| scrub_text(s, secrets))
                .collect(),
        }
    }
}

impl fmt::Display for RiskVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (score {}): {}",
            self.decision,
            self.risk_score,
            self.reasons.join("; ")
        )
    }
}

fn clamp_score(score: i64) -> u8 {
    u8::try_from(score.clamp(0, i64::from(MAX_RISK_SCORE))).unwrap_or(MAX_RISK_SCORE)
}

//! Mapping a verdict onto the configured thresholds.

use warden_config::RiskThresholds;
use warden_core::{RiskDecision, RiskVerdict};

/// Resolve a reviewer verdict against the thresholds.
///
/// Rules apply in order; the first that matches wins:
///
/// 1. `BLOCK` stays `BLOCK`.
/// 2. `ALLOW` with a score above `allow_max` needs approval.
/// 3. A score at or above `block_min` blocks.
/// 4. A score at or above `approval_min` needs approval.
/// 5. A score at or below `allow_max` allows.
/// 6. Otherwise the verdict's own decision stands.
///
/// Rule 6 is only reached by scores that fall between `allow_max` and
/// `approval_min` when the two are not adjacent.
#[must_use]
pub fn resolve_decision(verdict: &RiskVerdict, thresholds: &RiskThresholds) -> RiskDecision {
    let score = verdict.risk_score;
    match verdict.decision {
        RiskDecision::Block => RiskDecision::Block,
        RiskDecision::Allow if score > thresholds.allow_max() => RiskDecision::RequireApproval,
        _ if score >= thresholds.block_min() => RiskDecision::Block,
        _ if score >= thresholds.approval_min() => RiskDecision::RequireApproval,
        _ if score <= thresholds.allow_max() => RiskDecision::Allow,
        own => own,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(decision: RiskDecision, score: i64) -> RiskVerdict {
        RiskVerdict::new(decision, score, vec!["r".to_string()])
    }

    fn default_thresholds() -> RiskThresholds {
        RiskThresholds::new(30, 31, 71).unwrap()
    }

    #[test]
    fn test_block_is_final() {
        let t = default_thresholds();
        assert_eq!(resolve_decision(&verdict(RiskDecision::Block, 0), &t), RiskDecision::Block);
    }

    #[test]
    fn test_allow_above_allow_max_needs_approval() {
        let t = default_thresholds();
        assert_eq!(
            resolve_decision(&verdict(RiskDecision::Allow, 50), &t),
            RiskDecision::RequireApproval
        );
        // Rule 2 precedes rule 3.
        assert_eq!(
            resolve_decision(&verdict(RiskDecision::Allow, 95), &t),
            RiskDecision::RequireApproval
        );
    }

    #[test]
    fn test_score_bands() {
        let t = default_thresholds();
        let cases = [
            (RiskDecision::RequireApproval, 71, RiskDecision::Block),
            (RiskDecision::RequireApproval, 70, RiskDecision::RequireApproval),
            (RiskDecision::RequireApproval, 31, RiskDecision::RequireApproval),
            (RiskDecision::RequireApproval, 30, RiskDecision::Allow),
            (RiskDecision::Allow, 30, RiskDecision::Allow),
            (RiskDecision::Allow, 0, RiskDecision::Allow),
        ];
        for (decision, score, expected) in cases {
            assert_eq!(
                resolve_decision(&verdict(decision, score), &t),
                expected,
                "{decision} at {score}"
            );
        }
    }

    #[test]
    fn test_overlapping_thresholds() {
        // approval_min == block_min: approval band is empty.
        let t = RiskThresholds::new(20, 60, 60).unwrap();
        assert_eq!(
            resolve_decision(&verdict(RiskDecision::RequireApproval, 60), &t),
            RiskDecision::Block
        );
        assert_eq!(
            resolve_decision(&verdict(RiskDecision::RequireApproval, 59), &t),
            RiskDecision::RequireApproval
        );
    }

    #[test]
    fn test_gap_passes_own_decision_through() {
        // Scores strictly between allow_max and approval_min fall to rule 6.
        let t = RiskThresholds::new(20, 60, 80).unwrap();
        assert_eq!(
            resolve_decision(&verdict(RiskDecision::RequireApproval, 40), &t),
            RiskDecision::RequireApproval
        );
    }
}

//! Strict decoding of reviewer responses.
//!
//! A response either decodes to a [`RiskVerdict`] or is rejected with a
//! reason. Required fields with the wrong JSON type are rejected. Values of
//! the right type but outside the allowed domain (an unknown decision, a
//! score outside `0..=100`) are repaired: the score is rounded and clamped
//! and the decision becomes `REQUIRE_APPROVAL`.

use serde_json::Value;
use tracing::warn;

use warden_core::{MAX_RISK_SCORE, RiskDecision, RiskVerdict};

/// Outcome of decoding a reviewer response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedReview {
    /// The response decoded (possibly after repair).
    Valid(RiskVerdict),
    /// The response cannot be used; carries the reason.
    Invalid(String),
}

impl DecodedReview {
    /// The verdict, if the response was usable.
    #[must_use]
    pub fn verdict(self) -> Option<RiskVerdict> {
        match self {
            Self::Valid(verdict) => Some(verdict),
            Self::Invalid(_) => None,
        }
    }
}

/// Decode a raw reviewer response.
#[must_use]
pub fn decode_review(raw: &Value) -> DecodedReview {
    match try_decode(raw) {
        Ok(verdict) => DecodedReview::Valid(verdict),
        Err(reason) => DecodedReview::Invalid(reason),
    }
}

fn try_decode(raw: &Value) -> Result<RiskVerdict, String> {
    let object = raw
        .as_object()
        .ok_or_else(|| format!("expected a JSON object, got {}", kind(raw)))?;

    let decision = match object.get("decision") {
        Some(Value::String(s)) => s.as_str(),
        Some(other) => return Err(format!("'decision' must be a string, got {}", kind(other))),
        None => return Err("missing 'decision'".to_string()),
    };

    let score = match object.get("riskScore") {
        Some(Value::Number(n)) => n
            .as_f64()
            .ok_or_else(|| "'riskScore' is not representable".to_string())?,
        Some(other) => return Err(format!("'riskScore' must be a number, got {}", kind(other))),
        None => return Err("missing 'riskScore'".to_string()),
    };

    let reasons = match object.get("reasons") {
        Some(value) => string_list(value, "reasons")?,
        None => return Err("missing 'reasons'".to_string()),
    };

    let suggested = match object.get("suggestedChanges") {
        None | Some(Value::Null) => Vec::new(),
        Some(value) => string_list(value, "suggestedChanges")?,
    };

    let in_range = (0.0..=f64::from(MAX_RISK_SCORE)).contains(&score);
    let decision = match decision.parse::<RiskDecision>() {
        Ok(parsed) if in_range => parsed,
        Ok(_) => {
            warn!(score, "reviewer score out of range, requiring approval");
            RiskDecision::RequireApproval
        },
        Err(e) => {
            warn!(error = %e, "reviewer returned an unknown decision, requiring approval");
            RiskDecision::RequireApproval
        },
    };

    Ok(RiskVerdict::new(decision, round_score(score), reasons).with_suggested_changes(suggested))
}

fn string_list(value: &Value, field: &str) -> Result<Vec<String>, String> {
    let items = value
        .as_array()
        .ok_or_else(|| format!("'{field}' must be an array, got {}", kind(value)))?;
    items
        .iter()
        .map(|item| match item {
            Value::String(s) => Ok(s.clone()),
            other => Err(format!("'{field}' entries must be strings, got {}", kind(other))),
        })
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn round_score(score: f64) -> i64 {
    // Clamped before the cast, so the conversion is exact.
    score.round().clamp(-1.0, f64::from(MAX_RISK_SCORE) + 1.0) as i64
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid(raw: Value) -> RiskVerdict {
        match decode_review(&raw) {
            DecodedReview::Valid(v) => v,
            DecodedReview::Invalid(reason) => panic!("expected valid, got: {reason}"),
        }
    }

    fn invalid(raw: Value) -> String {
        match decode_review(&raw) {
            DecodedReview::Invalid(reason) => reason,
            DecodedReview::Valid(v) => panic!("expected invalid, got: {v}"),
        }
    }

    #[test]
    fn test_decodes_well_formed_response() {
        let v = valid(json!({
            "decision": "BLOCK",
            "riskScore": 88,
            "reasons": ["deletes all orders"],
            "suggestedChanges": ["scope the delete to one order"],
        }));
        assert_eq!(v.decision, RiskDecision::Block);
        assert_eq!(v.risk_score, 88);
        assert_eq!(v.reasons, vec!["deletes all orders".to_string()]);
        assert_eq!(v.suggested_changes.len(), 1);
    }

    #[test]
    fn test_missing_fields_are_invalid() {
        assert!(invalid(json!({"riskScore": 1, "reasons": []})).contains("decision"));
        assert!(invalid(json!({"decision": "ALLOW", "reasons": []})).contains("riskScore"));
        assert!(invalid(json!({"decision": "ALLOW", "riskScore": 1})).contains("reasons"));
    }

    #[test]
    fn test_wrong_types_are_invalid() {
        assert!(invalid(json!("ALLOW")).contains("object"));
        assert!(invalid(json!({"decision": 1, "riskScore": 1, "reasons": []})).contains("string"));
        assert!(
            invalid(json!({"decision": "ALLOW", "riskScore": "low", "reasons": []}))
                .contains("number")
        );
        assert!(
            invalid(json!({"decision": "ALLOW", "riskScore": 1, "reasons": "fine"}))
                .contains("array")
        );
        assert!(
            invalid(json!({"decision": "ALLOW", "riskScore": 1, "reasons": ["ok", 2]}))
                .contains("entries")
        );
        assert!(
            invalid(json!({
                "decision": "ALLOW", "riskScore": 1, "reasons": [], "suggestedChanges": "x"
            }))
            .contains("suggestedChanges")
        );
    }

    #[test]
    fn test_unknown_decision_is_coerced() {
        let v = valid(json!({"decision": "MAYBE", "riskScore": 10, "reasons": ["unsure"]}));
        assert_eq!(v.decision, RiskDecision::RequireApproval);
        assert_eq!(v.risk_score, 10);

        let lower = valid(json!({"decision": "allow", "riskScore": 10, "reasons": ["x"]}));
        assert_eq!(lower.decision, RiskDecision::RequireApproval);
    }

    #[test]
    fn test_out_of_range_score_is_clamped_and_coerced() {
        let high = valid(json!({"decision": "ALLOW", "riskScore": 140, "reasons": ["x"]}));
        assert_eq!(high.risk_score, 100);
        assert_eq!(high.decision, RiskDecision::RequireApproval);

        let low = valid(json!({"decision": "BLOCK", "riskScore": -3.5, "reasons": ["x"]}));
        assert_eq!(low.risk_score, 0);
        assert_eq!(low.decision, RiskDecision::RequireApproval);
    }

    #[test]
    fn test_fractional_score_is_rounded() {
        let v = valid(json!({"decision": "ALLOW", "riskScore": 12.6, "reasons": ["x"]}));
        assert_eq!(v.risk_score, 13);
        assert_eq!(v.decision, RiskDecision::Allow);
    }

    #[test]
    fn test_empty_reasons_get_placeholder() {
        let v = valid(json!({"decision": "ALLOW", "riskScore": 5, "reasons": []}));
        assert_eq!(v.reasons.len(), 1);
        assert!(!v.reasons[0].is_empty());
    }

    #[test]
    fn test_null_suggested_changes_is_absent() {
        let v = valid(json!({
            "decision": "ALLOW", "riskScore": 5, "reasons": ["x"], "suggestedChanges": null
        }));
        assert!(v.suggested_changes.is_empty());
        assert!(decode_review(&json!({"decision": "ALLOW"})).verdict().is_none());
    }
}

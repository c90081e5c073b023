//! Deterministic policy engine.
//!
//! # Policy Check Order
//!
//! 1. Is the resource enabled? If not, stop with a single violation.
//! 2. Does the upstream host pass the domain lock?
//! 3. Is the caller within its rate limit?
//! 4. Are the verb and path on the allowlist?
//! 5. Do the arguments match the declared schema?
//! 6. Are watched numeric fields within their ceilings?
//!
//! Violations from checks 2-6 accumulate. Any violation blocks the request
//! and clears `requires_approval`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use warden_config::{PolicyConfig, WATCHED_NUMERIC_FIELDS};
use warden_core::{Classification, FieldType, InvocationRequest, check_upstream_host};

use crate::rate_limit::{RateDecision, RateLimiter};

/// One deterministic policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyCheck {
    /// The resource accepts invocations.
    Enabled,
    /// The upstream host is not internal.
    DomainLock,
    /// The caller is within its fixed-window rate limit.
    RateLimit,
    /// The verb and path are allowlisted.
    VerbPath,
    /// The arguments match the declared schema.
    Shape,
    /// Watched numeric fields are within their ceilings.
    NumericCeilings,
}

/// The order in which checks run.
pub const POLICY_CHECK_ORDER: [PolicyCheck; 6] = [
    PolicyCheck::Enabled,
    PolicyCheck::DomainLock,
    PolicyCheck::RateLimit,
    PolicyCheck::VerbPath,
    PolicyCheck::Shape,
    PolicyCheck::NumericCeilings,
];

impl PolicyCheck {
    /// Stable snake_case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enabled => "enabled",
            Self::DomainLock => "domain_lock",
            Self::RateLimit => "rate_limit",
            Self::VerbPath => "verb_path",
            Self::Shape => "shape",
            Self::NumericCeilings => "numeric_ceilings",
        }
    }
}

impl fmt::Display for PolicyCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed check with a human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    /// The check that failed.
    pub check: PolicyCheck,
    /// What was wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.check, self.message)
    }
}

/// Result of evaluating a request against a policy snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyResult {
    /// Whether every check passed.
    pub allowed: bool,
    /// Failed checks, in check order.
    pub violations: Vec<Violation>,
    /// Whether the request must be held for a human. Always `false` when
    /// there are violations.
    pub requires_approval: bool,
    /// Checks that ran, in order.
    pub evaluated: Vec<PolicyCheck>,
    /// Why approval is required, if it is.
    pub approval_reason: Option<String>,
}

impl PolicyResult {
    /// Violation messages, in order.
    #[must_use]
    pub fn violation_messages(&self) -> Vec<String> {
        self.violations.iter().map(ToString::to_string).collect()
    }
}

/// Stateless rule evaluator; the only state it touches is the shared
/// [`RateLimiter`].
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    rate_limiter: Arc<RateLimiter>,
}

impl PolicyEngine {
    /// Create an engine over a shared rate limiter.
    #[must_use]
    pub fn new(rate_limiter: Arc<RateLimiter>) -> Self {
        Self { rate_limiter }
    }

    /// The shared rate limiter.
    #[must_use]
    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Evaluate a request against a policy snapshot at time `now`.
    #[must_use]
    pub fn evaluate(
        &self,
        request: &InvocationRequest,
        config: &PolicyConfig,
        now: DateTime<Utc>,
    ) -> PolicyResult {
        let mut violations = Vec::new();
        let mut evaluated = Vec::with_capacity(POLICY_CHECK_ORDER.len());

        for check in POLICY_CHECK_ORDER {
            evaluated.push(check);
            match check {
                PolicyCheck::Enabled => {
                    if !config.enabled {
                        violations.push(Violation {
                            check,
                            message: format!("resource '{}' is disabled", request.resource_id()),
                        });
                        break;
                    }
                },
                PolicyCheck::DomainLock => {
                    if let Err(rejection) = check_upstream_host(&config.base_url) {
                        violations.push(Violation {
                            check,
                            message: rejection.to_string(),
                        });
                    }
                },
                PolicyCheck::RateLimit => {
                    if let Some(message) = self.check_rate(request, config, now) {
                        violations.push(Violation { check, message });
                    }
                },
                PolicyCheck::VerbPath => {
                    violations.extend(
                        check_verb_path(request, config)
                            .into_iter()
                            .map(|message| Violation { check, message }),
                    );
                },
                PolicyCheck::Shape => {
                    violations.extend(
                        check_shape(request)
                            .into_iter()
                            .map(|message| Violation { check, message }),
                    );
                },
                PolicyCheck::NumericCeilings => {
                    violations.extend(
                        check_ceilings(request.arguments(), config)
                            .into_iter()
                            .map(|message| Violation { check, message }),
                    );
                },
            }
        }

        let approval_reason = if violations.is_empty() {
            approval_trigger(request.classification(), config)
        } else {
            None
        };

        PolicyResult {
            allowed: violations.is_empty(),
            requires_approval: approval_reason.is_some(),
            violations,
            evaluated,
            approval_reason,
        }
    }

    fn check_rate(
        &self,
        request: &InvocationRequest,
        config: &PolicyConfig,
        now: DateTime<Utc>,
    ) -> Option<String> {
        let limit = config.rate_limit.as_ref()?;
        match self.rate_limiter.check_and_record(
            request.resource_id(),
            request.rate_limit_key(),
            limit,
            now,
        ) {
            RateDecision::Admitted { .. } => None,
            RateDecision::Limited {
                max_requests,
                window_end,
            } => Some(format!(
                "caller '{}' exceeded {max_requests} requests per {}s (window ends {})",
                request.rate_limit_key(),
                limit.window_secs,
                window_end.to_rfc3339()
            )),
        }
    }
}

fn approval_trigger(classification: Classification, config: &PolicyConfig) -> Option<String> {
    match classification {
        Classification::Write if config.require_approval_for_writes => {
            Some("WRITE operations require approval".to_string())
        },
        Classification::Dangerous if config.require_approval_for_dangerous => {
            Some("DANGEROUS operations require approval".to_string())
        },
        _ => None,
    }
}

fn check_verb_path(request: &InvocationRequest, config: &PolicyConfig) -> Vec<String> {
    let mut problems = Vec::new();

    if !config.allowed_verbs.contains(&request.verb()) {
        problems.push(format!("verb {} is not allowed", request.verb()));
    }

    let path = request
        .path()
        .split_once('?')
        .map_or(request.path(), |(path, _)| path);

    if path.split('/').any(|segment| segment == "..") {
        problems.push(format!("path '{path}' contains a traversal segment"));
    } else if !config.allowed_paths.is_empty()
        && !config.allowed_paths.iter().any(|p| p.matches(path))
    {
        problems.push(format!("path '{path}' is not in allowed paths"));
    }

    problems
}

fn check_shape(request: &InvocationRequest) -> Vec<String> {
    let Some(schema) = request.schema() else {
        return Vec::new();
    };
    let args = request.arguments();
    let mut problems = Vec::new();

    for name in &schema.required {
        if !args.contains_key(name) {
            problems.push(format!("required field '{name}' is missing"));
        }
    }

    for (name, expected) in &schema.fields {
        let Some(value) = args.get(name) else {
            continue;
        };
        if value.is_null() && !schema.required.contains(name) {
            continue;
        }
        if !expected.matches(value) {
            problems.push(format!(
                "field '{name}' should be {expected}, got {}",
                FieldType::describe(value)
            ));
        }
    }

    problems
}

fn check_ceilings(args: &Map<String, Value>, config: &PolicyConfig) -> Vec<String> {
    let mut problems = Vec::new();
    if config.numeric_ceilings.is_empty() {
        return problems;
    }
    walk_ceilings(args, "", config, &mut problems);
    problems
}

fn walk_ceilings(
    map: &Map<String, Value>,
    prefix: &str,
    config: &PolicyConfig,
    problems: &mut Vec<String>,
) {
    for (key, value) in map {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        let watched = WATCHED_NUMERIC_FIELDS.contains(&key.as_str());
        if watched
            && let Some(ceiling) = config.numeric_ceilings.get(key)
            && let Some(n) = numeric(value)
            && n > *ceiling
        {
            problems.push(format!("{path} = {n} exceeds ceiling {ceiling}"));
        }

        match value {
            Value::Object(inner) => walk_ceilings(inner, &path, config, problems),
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if let Value::Object(inner) = item {
                        walk_ceilings(inner, &format!("{path}[{i}]"), config, problems);
                    }
                }
            },
            _ => {},
        }
    }
}

/// Numeric value of a JSON number or a numeric string.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use warden_config::RateLimit;
    use warden_core::{ArgumentSchema, HttpVerb};

    fn engine() -> PolicyEngine {
        PolicyEngine::new(Arc::new(RateLimiter::new()))
    }

    fn config() -> PolicyConfig {
        PolicyConfig::new("https://api.shop.example", [HttpVerb::Get, HttpVerb::Post])
            .with_path("/orders")
            .unwrap()
            .with_path("/orders/{id}")
            .unwrap()
            .with_dangerous_approval(false)
    }

    fn get_orders() -> InvocationRequest {
        InvocationRequest::new("shop", "listOrders", HttpVerb::Get, "/orders")
    }

    #[test]
    fn test_clean_request_allowed() {
        let result = engine().evaluate(&get_orders(), &config(), Utc::now());
        assert!(result.allowed);
        assert!(result.violations.is_empty());
        assert!(!result.requires_approval);
        assert_eq!(result.evaluated, POLICY_CHECK_ORDER.to_vec());
    }

    #[test]
    fn test_disabled_short_circuits() {
        let cfg = config().with_enabled(false);
        let request = InvocationRequest::new("shop", "x", HttpVerb::Delete, "/nope");
        let result = engine().evaluate(&request, &cfg, Utc::now());

        assert!(!result.allowed);
        assert_eq!(result.violations.len(), 1);
        assert_eq!(result.violations[0].check, PolicyCheck::Enabled);
        assert_eq!(result.evaluated, vec![PolicyCheck::Enabled]);
    }

    #[test]
    fn test_verb_outside_allowlist_cites_verb() {
        let request = InvocationRequest::new("shop", "deleteOrder", HttpVerb::Delete, "/orders/1");
        let result = engine().evaluate(&request, &config(), Utc::now());

        assert!(!result.allowed);
        assert_eq!(result.violations[0].check, PolicyCheck::VerbPath);
        assert!(result.violations[0].message.contains("DELETE"));
    }

    #[test]
    fn test_path_allowlist_ignores_query() {
        let request = InvocationRequest::new("shop", "getOrder", HttpVerb::Get, "/orders/7?expand=items");
        assert!(engine().evaluate(&request, &config(), Utc::now()).allowed);

        let request = InvocationRequest::new("shop", "getItems", HttpVerb::Get, "/orders/7/items");
        assert!(!engine().evaluate(&request, &config(), Utc::now()).allowed);
    }

    #[test]
    fn test_path_traversal_blocked() {
        let cfg = PolicyConfig::new("https://api.shop.example", [HttpVerb::Get]);
        let request = InvocationRequest::new("shop", "x", HttpVerb::Get, "/orders/../admin");
        let result = engine().evaluate(&request, &cfg, Utc::now());
        assert!(!result.allowed);
        assert!(result.violations[0].message.contains("traversal"));
    }

    #[test]
    fn test_traversal_is_judged_on_url_segments() {
        let cfg = PolicyConfig::new("https://api.shop.example", [HttpVerb::Get]);
        let trailing = InvocationRequest::new("shop", "x", HttpVerb::Get, "/orders/..");
        assert!(!engine().evaluate(&trailing, &cfg, Utc::now()).allowed);

        for path in ["/orders/..\\admin", "/orders/a..b", "/orders/.../x"] {
            let request = InvocationRequest::new("shop", "x", HttpVerb::Get, path);
            let result = engine().evaluate(&request, &cfg, Utc::now());
            assert!(result.allowed, "{path}: {:?}", result.violations);
        }
    }

    #[test]
    fn test_private_upstream_always_blocked() {
        let mut cfg = config();
        cfg.base_url = "http://192.168.1.5/api".to_string();
        let result = engine().evaluate(&get_orders(), &cfg, Utc::now());

        assert!(!result.allowed);
        assert_eq!(result.violations[0].check, PolicyCheck::DomainLock);
    }

    #[test]
    fn test_violations_accumulate_in_order() {
        let mut cfg = config().with_ceiling("amount", 10.0);
        cfg.base_url = "http://localhost".to_string();
        let request = InvocationRequest::new("shop", "x", HttpVerb::Put, "/orders")
            .with_json_arguments(json!({"amount": 11}));

        let result = engine().evaluate(&request, &cfg, Utc::now());
        let checks: Vec<_> = result.violations.iter().map(|v| v.check).collect();
        assert_eq!(checks, vec![
            PolicyCheck::DomainLock,
            PolicyCheck::VerbPath,
            PolicyCheck::NumericCeilings
        ]);
    }

    #[test]
    fn test_rate_limit_n_plus_one_blocked() {
        let engine = engine();
        let cfg = config().with_rate_limit(RateLimit::new(2, 60));
        let now = Utc::now();

        assert!(engine.evaluate(&get_orders(), &cfg, now).allowed);
        assert!(engine.evaluate(&get_orders(), &cfg, now).allowed);
        let third = engine.evaluate(&get_orders(), &cfg, now);
        assert!(!third.allowed);
        assert_eq!(third.violations[0].check, PolicyCheck::RateLimit);

        let later = now.checked_add_signed(chrono::TimeDelta::seconds(61)).unwrap();
        assert!(engine.evaluate(&get_orders(), &cfg, later).allowed);
    }

    #[test]
    fn test_numeric_ceiling_boundary() {
        let cfg = config().with_ceiling("amount", 100_000.0);
        let at = InvocationRequest::new("shop", "pay", HttpVerb::Post, "/orders")
            .with_json_arguments(json!({"amount": 100_000}));
        let over = InvocationRequest::new("shop", "pay", HttpVerb::Post, "/orders")
            .with_json_arguments(json!({"amount": 100_001}));

        assert!(engine().evaluate(&at, &cfg, Utc::now()).allowed);
        let result = engine().evaluate(&over, &cfg, Utc::now());
        assert!(!result.allowed);
        assert_eq!(result.violations[0].check, PolicyCheck::NumericCeilings);
    }

    #[test]
    fn test_numeric_ceiling_nested_and_string() {
        let cfg = config().with_ceiling("quantity", 5.0);
        let request = InvocationRequest::new("shop", "pay", HttpVerb::Post, "/orders")
            .with_json_arguments(json!({"lines": [{"quantity": "9"}]}));
        let result = engine().evaluate(&request, &cfg, Utc::now());
        assert!(!result.allowed);
        assert!(result.violations[0].message.contains("lines[0].quantity"));
    }

    #[test]
    fn test_shape_mismatch_is_violation() {
        let schema = ArgumentSchema::new()
            .require("sku", FieldType::String)
            .optional("qty", FieldType::Number);
        let request = InvocationRequest::new("shop", "add", HttpVerb::Post, "/orders")
            .with_schema(schema)
            .with_json_arguments(json!({"qty": "three"}));

        let result = engine().evaluate(&request, &config(), Utc::now());
        assert!(!result.allowed);
        let messages = result.violation_messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("'sku' is missing"));
        assert!(messages[1].contains("'qty' should be number"));
    }

    #[test]
    fn test_write_requires_approval_when_flagged() {
        let cfg = config().with_write_approval(true);
        let request = InvocationRequest::new("shop", "createOrder", HttpVerb::Post, "/orders")
            .with_classification(Classification::Write);

        let result = engine().evaluate(&request, &cfg, Utc::now());
        assert!(result.allowed);
        assert!(result.requires_approval);
    }

    #[test]
    fn test_violation_clears_requires_approval() {
        let cfg = config().with_dangerous_approval(true);
        let request = InvocationRequest::new("shop", "purge", HttpVerb::Delete, "/orders")
            .with_classification(Classification::Dangerous);

        let result = engine().evaluate(&request, &cfg, Utc::now());
        assert!(!result.allowed);
        assert!(!result.requires_approval);
        assert!(result.approval_reason.is_none());
    }
}

//! Configuration types for the Warden gateway.
//!
//! Every struct implements [`Default`] so that a bare `[section]` header in
//! TOML produces a working, fail-closed configuration.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::time::Duration;

use warden_core::{HttpVerb, ResourceId, RiskDecision};

use crate::error::{ConfigError, ConfigResult};
use crate::pattern::PathPattern;

/// Argument names subject to numeric ceilings.
///
/// A ceiling may only be configured for one of these names.
pub const WATCHED_NUMERIC_FIELDS: &[&str] = &[
    "amount", "quantity", "qty", "size", "count", "total", "price", "value", "limit",
];

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration file for a Warden gateway.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Logging level, format, and per-crate directives.
    pub logging: LoggingSection,
    /// Approval lifecycle settings.
    pub approvals: ApprovalSection,
    /// Protected resources.
    pub resources: Vec<ResourceConfig>,
}

/// Configuration for one protected upstream resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Resource identifier that requests refer to.
    pub id: ResourceId,
    /// Deterministic policy.
    #[serde(default)]
    pub policy: PolicyConfig,
    /// External risk review.
    #[serde(default)]
    pub review: RiskReviewConfig,
}

impl ResourceConfig {
    /// Create a resource config with default policy and review settings.
    #[must_use]
    pub fn new(id: impl Into<ResourceId>, policy: PolicyConfig) -> Self {
        Self {
            id: id.into(),
            policy,
            review: RiskReviewConfig::default(),
        }
    }

    /// Set the risk review config.
    #[must_use]
    pub fn with_review(mut self, review: RiskReviewConfig) -> Self {
        self.review = review;
        self
    }
}

// ---------------------------------------------------------------------------
// PolicyConfig
// ---------------------------------------------------------------------------

/// Fixed-window rate limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests admitted per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
}

impl RateLimit {
    /// Create a rate limit of `max_requests` per `window_secs`.
    #[must_use]
    pub fn new(max_requests: u32, window_secs: u64) -> Self {
        Self {
            max_requests,
            window_secs,
        }
    }

    /// Window length.
    #[must_use]
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

/// Deterministic policy for one protected resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct PolicyConfig {
    /// Snapshot version, bumped by [`ConfigStore`](crate::ConfigStore) on every update.
    pub version: u64,
    /// Upstream base URL; its host is subject to the domain lock.
    pub base_url: String,
    /// Whether the resource accepts invocations at all.
    pub enabled: bool,
    /// Simulate ALLOW outcomes instead of calling upstream.
    pub dry_run: bool,
    /// Verbs that may be invoked.
    pub allowed_verbs: BTreeSet<HttpVerb>,
    /// Path allowlist; empty means any path.
    pub allowed_paths: Vec<PathPattern>,
    /// Per-caller fixed-window rate limit.
    pub rate_limit: Option<RateLimit>,
    /// Ceilings for watched numeric argument fields.
    pub numeric_ceilings: BTreeMap<String, f64>,
    /// Hold WRITE operations for human approval.
    pub require_approval_for_writes: bool,
    /// Hold DANGEROUS operations for human approval.
    pub require_approval_for_dangerous: bool,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            version: 0,
            base_url: String::new(),
            enabled: true,
            dry_run: false,
            allowed_verbs: BTreeSet::new(),
            allowed_paths: Vec::new(),
            rate_limit: None,
            numeric_ceilings: BTreeMap::new(),
            require_approval_for_writes: false,
            require_approval_for_dangerous: true,
        }
    }
}

impl PolicyConfig {
    /// Create a policy for the given upstream allowing the given verbs.
    #[must_use]
    pub fn new(base_url: impl Into<String>, verbs: impl IntoIterator<Item = HttpVerb>) -> Self {
        Self {
            base_url: base_url.into(),
            allowed_verbs: verbs.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Add an allowed path pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidPattern`] if the pattern does not compile.
    pub fn with_path(mut self, pattern: &str) -> ConfigResult<Self> {
        self.allowed_paths.push(PathPattern::new(pattern)?);
        Ok(self)
    }

    /// Set the rate limit.
    #[must_use]
    pub fn with_rate_limit(mut self, limit: RateLimit) -> Self {
        self.rate_limit = Some(limit);
        self
    }

    /// Set a numeric ceiling for a watched field.
    #[must_use]
    pub fn with_ceiling(mut self, field: impl Into<String>, max: f64) -> Self {
        self.numeric_ceilings.insert(field.into(), max);
        self
    }

    /// Require approval for WRITE operations.
    #[must_use]
    pub fn with_write_approval(mut self, required: bool) -> Self {
        self.require_approval_for_writes = required;
        self
    }

    /// Require approval for DANGEROUS operations.
    #[must_use]
    pub fn with_dangerous_approval(mut self, required: bool) -> Self {
        self.require_approval_for_dangerous = required;
        self
    }

    /// Enable or disable the resource.
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Enable or disable dry-run.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

// ---------------------------------------------------------------------------
// RiskReviewConfig
// ---------------------------------------------------------------------------

/// How the risk reviewer's verdict is used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewMode {
    /// Recorded in the audit trail only; never changes the outcome.
    Advisory,
    /// Gates execution.
    #[default]
    Enforcing,
}

impl fmt::Display for ReviewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advisory => write!(f, "advisory"),
            Self::Enforcing => write!(f, "enforcing"),
        }
    }
}

/// Score bands partitioning `0..=100` into ALLOW / REQUIRE_APPROVAL / BLOCK.
///
/// Always satisfies `allow_max < approval_min <= block_min <= 100`; values
/// that violate this cannot be constructed or deserialized.
///
/// # Example
///
/// ```
/// use warden_config::RiskThresholds;
///
/// let t = RiskThresholds::new(30, 31, 71).unwrap();
/// assert_eq!(t.block_min(), 71);
/// assert!(RiskThresholds::new(80, 81, 70).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawThresholds", into = "RawThresholds")]
pub struct RiskThresholds {
    allow_max: u8,
    approval_min: u8,
    block_min: u8,
}

/// Unvalidated wire form of [`RiskThresholds`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RawThresholds {
    /// Highest score still allowed.
    pub allow_max: u8,
    /// Lowest score that requires approval.
    pub approval_min: u8,
    /// Lowest score that is blocked.
    pub block_min: u8,
}

impl RiskThresholds {
    /// Build validated thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] unless
    /// `allow_max < approval_min <= block_min <= 100`.
    pub fn new(allow_max: u8, approval_min: u8, block_min: u8) -> ConfigResult<Self> {
        let fail = |message: String| ConfigError::ValidationError {
            field: "review.thresholds".to_owned(),
            message,
        };
        if block_min > 100 {
            return Err(fail(format!("block_min ({block_min}) exceeds 100")));
        }
        if allow_max >= block_min {
            return Err(fail(format!(
                "allow_max ({allow_max}) must be below block_min ({block_min})"
            )));
        }
        if approval_min <= allow_max {
            return Err(fail(format!(
                "approval_min ({approval_min}) must be above allow_max ({allow_max})"
            )));
        }
        if approval_min > block_min {
            return Err(fail(format!(
                "approval_min ({approval_min}) must not exceed block_min ({block_min})"
            )));
        }
        Ok(Self {
            allow_max,
            approval_min,
            block_min,
        })
    }

    /// Highest score still allowed.
    #[must_use]
    pub fn allow_max(&self) -> u8 {
        self.allow_max
    }

    /// Lowest score that requires approval.
    #[must_use]
    pub fn approval_min(&self) -> u8 {
        self.approval_min
    }

    /// Lowest score that is blocked.
    #[must_use]
    pub fn block_min(&self) -> u8 {
        self.block_min
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            allow_max: 30,
            approval_min: 31,
            block_min: 71,
        }
    }
}

impl TryFrom<RawThresholds> for RiskThresholds {
    type Error = ConfigError;

    fn try_from(raw: RawThresholds) -> Result<Self, Self::Error> {
        Self::new(raw.allow_max, raw.approval_min, raw.block_min)
    }
}

impl From<RiskThresholds> for RawThresholds {
    fn from(t: RiskThresholds) -> Self {
        Self {
            allow_max: t.allow_max,
            approval_min: t.approval_min,
            block_min: t.block_min,
        }
    }
}

/// External risk review settings for one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskReviewConfig {
    /// Whether review runs at all.
    pub enabled: bool,
    /// Advisory or enforcing.
    pub mode: ReviewMode,
    /// Reviewer call timeout in milliseconds.
    pub timeout_ms: u64,
    /// Verdict applied when the reviewer is unavailable.
    pub fallback: RiskDecision,
    /// Score bands.
    pub thresholds: RiskThresholds,
    /// Reviewer endpoint for the HTTP reviewer.
    pub endpoint: Option<String>,
}

impl Default for RiskReviewConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: ReviewMode::default(),
            timeout_ms: 3_000,
            fallback: RiskDecision::RequireApproval,
            thresholds: RiskThresholds::default(),
            endpoint: None,
        }
    }
}

impl RiskReviewConfig {
    /// An enabled, enforcing review config with the given timeout.
    #[must_use]
    pub fn enforcing(timeout: Duration) -> Self {
        Self {
            enabled: true,
            mode: ReviewMode::Enforcing,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            ..Self::default()
        }
    }

    /// Set the mode.
    #[must_use]
    pub fn with_mode(mut self, mode: ReviewMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the fallback verdict.
    #[must_use]
    pub fn with_fallback(mut self, fallback: RiskDecision) -> Self {
        self.fallback = fallback;
        self
    }

    /// Set the thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, thresholds: RiskThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    /// Reviewer call timeout.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Approvals & logging
// ---------------------------------------------------------------------------

/// Approval lifecycle settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApprovalSection {
    /// Hours a pending approval stays open before it expires.
    pub expiry_hours: u64,
    /// Seconds between expiry sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for ApprovalSection {
    fn default() -> Self {
        Self {
            expiry_hours: 24,
            sweep_interval_secs: 60,
        }
    }
}

impl ApprovalSection {
    /// Pending-approval lifetime.
    #[must_use]
    pub fn expiry(&self) -> Duration {
        Duration::from_secs(self.expiry_hours.saturating_mul(3600))
    }

    /// Interval between expiry sweeps.
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

/// Logging level, format, and per-crate directives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level filter (`trace`, `debug`, `info`, `warn`, `error`).
    pub level: String,
    /// Output format (`pretty`, `compact`, `json`, `full`).
    pub format: String,
    /// Extra directives such as `warden_review=debug`.
    pub directives: Vec<String>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "pretty".to_owned(),
            directives: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_thresholds_invariant() {
        assert!(RiskThresholds::new(30, 31, 71).is_ok());
        assert!(RiskThresholds::new(30, 40, 71).is_ok());
        assert!(RiskThresholds::new(50, 50, 60).is_err());
        assert!(RiskThresholds::new(70, 71, 70).is_err());
        assert!(RiskThresholds::new(10, 90, 80).is_err());
        assert!(RiskThresholds::new(10, 20, 101).is_err());
    }

    #[test]
    fn test_thresholds_deserialize_validates() {
        let ok: RiskThresholds =
            toml::from_str("allow_max = 20\napproval_min = 21\nblock_min = 90").unwrap();
        assert_eq!(ok.allow_max(), 20);

        let bad = toml::from_str::<RiskThresholds>("allow_max = 90\napproval_min = 91\nblock_min = 50");
        assert!(bad.is_err());
    }

    #[test]
    fn test_policy_defaults_fail_closed() {
        let policy = PolicyConfig::default();
        assert!(policy.enabled);
        assert!(policy.allowed_verbs.is_empty());
        assert!(policy.require_approval_for_dangerous);
        assert!(!policy.require_approval_for_writes);
    }

    #[test]
    fn test_review_defaults() {
        let review = RiskReviewConfig::default();
        assert!(!review.enabled);
        assert_eq!(review.fallback, RiskDecision::RequireApproval);
        assert_eq!(review.timeout(), Duration::from_secs(3));
        assert_eq!(review.mode, ReviewMode::Enforcing);
    }

    #[test]
    fn test_resource_config_from_toml() {
        let toml_src = r#"
            id = "shop"

            [policy]
            base_url = "https://api.shop.example"
            allowed_verbs = ["GET", "POST"]
            allowed_paths = ["/orders", "/orders/{id}"]
            rate_limit = { max_requests = 10, window_secs = 60 }
            numeric_ceilings = { amount = 100000.0 }
            require_approval_for_writes = true

            [review]
            enabled = true
            mode = "advisory"
            timeout_ms = 500
            thresholds = { allow_max = 30, approval_min = 31, block_min = 71 }
        "#;

        let resource: ResourceConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(resource.id.as_str(), "shop");
        assert!(resource.policy.allowed_verbs.contains(&HttpVerb::Post));
        assert_eq!(resource.policy.allowed_paths.len(), 2);
        assert_eq!(resource.policy.rate_limit, Some(RateLimit::new(10, 60)));
        assert_eq!(resource.review.mode, ReviewMode::Advisory);
        assert_eq!(resource.review.timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_approval_section_expiry() {
        assert_eq!(
            ApprovalSection::default().expiry(),
            Duration::from_secs(24 * 3600)
        );
    }
}

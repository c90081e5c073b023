//! Audit record types.
//!
//! One [`AuditRecord`] is written per invocation attempt. After it is
//! written, the only permitted change is attaching the [`ExecutionResult`],
//! exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use warden_core::{
    ApprovalId, AuditRecordId, Classification, HttpVerb, InvocationRequest, Outcome, ResourceId,
    RiskDecision, RiskVerdict, redact_arguments,
};

/// Policy stage summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyOutcome {
    /// Whether every check passed.
    pub allowed: bool,
    /// Whether the policy demanded human approval.
    pub requires_approval: bool,
    /// Violation messages, in check order.
    pub violations: Vec<String>,
    /// Names of the checks that ran, in order.
    pub evaluated: Vec<String>,
    /// Version of the policy snapshot used.
    pub config_version: u64,
}

/// Risk review stage summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    /// Verdict used for resolution (the fallback verdict when unavailable).
    pub verdict: RiskVerdict,
    /// Decision after threshold resolution.
    pub resolved: RiskDecision,
    /// Whether the reviewer was unavailable and the fallback applied.
    pub fallback_used: bool,
    /// Whether the review ran in advisory mode.
    pub advisory: bool,
}

/// Approval stage summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalOutcome {
    /// The pending approval record.
    pub approval_id: ApprovalId,
    /// When it expires unless decided.
    pub expires_at: DateTime<Utc>,
}

/// Per-stage latency in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLatency {
    /// Policy evaluation.
    pub policy_us: u64,
    /// Risk review, if it ran.
    pub review_us: Option<u64>,
    /// Approval record creation, if it ran.
    pub approval_us: Option<u64>,
    /// Whole decision.
    pub total_us: u64,
}

impl StageLatency {
    /// Convert a duration to whole microseconds, saturating.
    #[must_use]
    pub fn micros(duration: Duration) -> u64 {
        u64::try_from(duration.as_micros()).unwrap_or(u64::MAX)
    }
}

/// What happened after the decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ExecutionResult {
    /// The upstream call ran.
    Executed {
        /// Short upstream result summary.
        summary: String,
    },
    /// The upstream call failed.
    Failed {
        /// Error message.
        error: String,
    },
    /// No upstream call was made.
    Skipped {
        /// Why.
        reason: String,
    },
}

/// Execution result plus when it was attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// The result.
    pub result: ExecutionResult,
    /// When it was attached.
    pub attached_at: DateTime<Utc>,
}

/// One append-only entry per invocation attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Record identifier.
    pub id: AuditRecordId,
    /// When the decision was recorded.
    pub created_at: DateTime<Utc>,
    /// Target resource.
    pub resource_id: ResourceId,
    /// Operation identifier.
    pub operation_id: String,
    /// HTTP verb.
    pub verb: HttpVerb,
    /// Target path.
    pub path: String,
    /// Caller / rate-limit key.
    pub caller: String,
    /// Classification tag.
    pub classification: Classification,
    /// Arguments with secret values redacted.
    pub arguments: Map<String, Value>,
    /// Upstream base URL the decision was made against. Execution uses
    /// this one, never a later configuration.
    #[serde(default)]
    pub base_url: String,
    /// Policy stage.
    pub policy: PolicyOutcome,
    /// Risk review stage, if it ran.
    pub review: Option<ReviewOutcome>,
    /// Approval stage, if a record was created.
    pub approval: Option<ApprovalOutcome>,
    /// Final outcome.
    pub outcome: Outcome,
    /// Human-readable reasons for the outcome (never empty).
    pub reasons: Vec<String>,
    /// Stage latencies.
    pub latency: StageLatency,
    /// Execution result, attached once after the decision.
    pub execution: Option<ExecutionRecord>,
}

impl AuditRecord {
    /// Start a record for a request. Arguments are redacted here.
    #[must_use]
    pub fn new(
        request: &InvocationRequest,
        policy: PolicyOutcome,
        outcome: Outcome,
        reasons: Vec<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditRecordId::new(),
            created_at,
            resource_id: request.resource_id().clone(),
            operation_id: request.operation_id().to_string(),
            verb: request.verb(),
            path: request.path().to_string(),
            caller: request.rate_limit_key().to_string(),
            classification: request.classification(),
            arguments: redact_arguments(request.arguments()).arguments,
            base_url: String::new(),
            policy,
            review: None,
            approval: None,
            outcome,
            reasons,
            latency: StageLatency::default(),
            execution: None,
        }
    }

    /// Record the upstream base URL the decision validated.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Attach the review stage.
    #[must_use]
    pub fn with_review(mut self, review: ReviewOutcome) -> Self {
        self.review = Some(review);
        self
    }

    /// Attach the approval stage.
    #[must_use]
    pub fn with_approval(mut self, approval: ApprovalOutcome) -> Self {
        self.approval = Some(approval);
        self
    }

    /// Set stage latencies.
    #[must_use]
    pub fn with_latency(mut self, latency: StageLatency) -> Self {
        self.latency = latency;
        self
    }
}

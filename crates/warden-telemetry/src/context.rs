//! Per-decision correlation context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Correlation data for one pass through the decision pipeline.
///
/// Every stage logs inside [`DecisionContext::span`], so the decision id
/// ties policy, review, and approval log lines together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionContext {
    /// Unique decision identifier.
    pub decision_id: Uuid,
    /// Protected resource.
    pub resource: String,
    /// Operation being attempted.
    pub operation: String,
    /// Caller / rate-limit key.
    pub caller: String,
    /// When the decision started.
    pub started_at: DateTime<Utc>,
}

impl DecisionContext {
    /// Create a context for a new decision.
    #[must_use]
    pub fn new(
        resource: impl Into<String>,
        operation: impl Into<String>,
        caller: impl Into<String>,
    ) -> Self {
        Self {
            decision_id: Uuid::new_v4(),
            resource: resource.into(),
            operation: operation.into(),
            caller: caller.into(),
            started_at: Utc::now(),
        }
    }

    /// Milliseconds since the decision started.
    #[must_use]
    pub fn elapsed_ms(&self) -> i64 {
        Utc::now()
            .signed_duration_since(self.started_at)
            .num_milliseconds()
    }

    /// Tracing span carrying this context's fields.
    #[must_use]
    pub fn span(&self) -> tracing::Span {
        tracing::info_span!(
            "decision",
            decision_id = %self.decision_id,
            resource = %self.resource,
            operation = %self.operation,
            caller = %self.caller,
        )
    }

    /// First eight characters of the decision id.
    #[must_use]
    pub fn short_id(&self) -> String {
        self.decision_id.simple().to_string().chars().take(8).collect()
    }
}

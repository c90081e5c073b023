use serde::{Deserialize, Serialize};

use warden_audit::AuditRecord;
use warden_core::{ApprovalId, Outcome};

/// Final answer of the decision pipeline for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalVerdict {
    /// What happens to the request.
    pub outcome: Outcome,
    /// Why (never empty).
    pub reasons: Vec<String>,
    /// Set when the outcome is PENDING.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<ApprovalId>,
    /// The record written for this decision.
    pub audit: AuditRecord,
}

impl FinalVerdict {
    /// Whether the request may be sent upstream.
    #[must_use]
    pub fn executes(&self) -> bool {
        self.outcome.executes()
    }
}

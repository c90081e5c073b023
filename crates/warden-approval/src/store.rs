//! Approval state machine.
//!
//! ```text
//! PENDING ──decide(approve)──▶ APPROVED ──claim_replay──▶ (replayed once)
//!    │ ──decide(reject)───▶ REJECTED
//!    └───sweep(now > expiry)─▶ EXPIRED
//! ```
//!
//! Terminal states never change. Every transition is a compare-and-swap on
//! the status under the record's own mutex; records live in a sharded map,
//! so unrelated approvals never contend.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info};

use warden_core::{ApprovalId, InvocationRequest, RiskVerdict, redact_arguments};

use crate::error::{ApprovalError, ApprovalResult};

/// Lifecycle status of an approval record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    /// Awaiting a human decision.
    Pending,
    /// A human approved; may be replayed once.
    Approved,
    /// A human rejected; never executes.
    Rejected,
    /// Nobody decided in time; never executes.
    Expired,
}

impl ApprovalStatus {
    /// Whether the status can no longer change.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Approved => write!(f, "APPROVED"),
            Self::Rejected => write!(f, "REJECTED"),
            Self::Expired => write!(f, "EXPIRED"),
        }
    }
}

/// A human's decision on a pending approval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HumanDecision {
    /// Allow the held request to execute.
    Approve,
    /// Refuse it.
    Reject,
}

impl HumanDecision {
    fn target(self) -> ApprovalStatus {
        match self {
            Self::Approve => ApprovalStatus::Approved,
            Self::Reject => ApprovalStatus::Rejected,
        }
    }
}

/// A request held for human review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalRecord {
    /// Record identifier.
    pub id: ApprovalId,
    /// The held request with its exact argument map, for replay.
    pub request: InvocationRequest,
    /// The risk verdict that triggered the hold, with secrets scrubbed.
    pub verdict: Option<RiskVerdict>,
    /// Lifecycle status.
    pub status: ApprovalStatus,
    /// Who decided.
    pub approver: Option<String>,
    /// Free-text note from the approver.
    pub note: Option<String>,
    /// When the record was created.
    pub created_at: DateTime<Utc>,
    /// When the record expires if still pending.
    pub expires_at: DateTime<Utc>,
    /// When the record reached a terminal status.
    pub decided_at: Option<DateTime<Utc>>,
    /// When the approved request was replayed.
    pub replayed_at: Option<DateTime<Utc>>,
}

impl ApprovalRecord {
    /// Whether a pending record is past its expiry at `now`.
    #[must_use]
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status == ApprovalStatus::Pending && now > self.expires_at
    }
}

type Slot = Arc<Mutex<ApprovalRecord>>;

fn lock(slot: &Slot) -> MutexGuard<'_, ApprovalRecord> {
    slot.lock().unwrap_or_else(|e| {
        tracing::warn!("approval record lock poisoned, recovering");
        e.into_inner()
    })
}

/// Concurrent store of approval records.
///
/// # Example
///
/// ```
/// use chrono::Utc;
/// use std::time::Duration;
/// use warden_approval::{ApprovalStatus, ApprovalStore, HumanDecision};
/// use warden_core::{HttpVerb, InvocationRequest};
///
/// let store = ApprovalStore::new(Duration::from_secs(3600));
/// let request = InvocationRequest::new("shop", "createOrder", HttpVerb::Post, "/orders");
/// let record = store.create(request, None, Utc::now());
///
/// let decided = store
///     .decide(&record.id, "alice", HumanDecision::Approve, None, Utc::now())
///     .unwrap();
/// assert_eq!(decided.status, ApprovalStatus::Approved);
/// ```
#[derive(Debug)]
pub struct ApprovalStore {
    records: DashMap<ApprovalId, Slot>,
    expiry: TimeDelta,
}

impl ApprovalStore {
    /// Create a store whose records expire `expiry` after creation.
    #[must_use]
    pub fn new(expiry: Duration) -> Self {
        Self {
            records: DashMap::new(),
            expiry: TimeDelta::from_std(expiry).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Create a PENDING record.
    ///
    /// Secret argument values are scrubbed from the stored verdict's text;
    /// the request itself is stored unmodified for exact replay.
    pub fn create(
        &self,
        request: InvocationRequest,
        verdict: Option<RiskVerdict>,
        now: DateTime<Utc>,
    ) -> ApprovalRecord {
        let secrets = redact_arguments(request.arguments()).secrets;
        let record = ApprovalRecord {
            id: ApprovalId::new(),
            verdict: verdict.map(|v| v.redacted(&secrets)),
            request,
            status: ApprovalStatus::Pending,
            approver: None,
            note: None,
            created_at: now,
            expires_at: now
                .checked_add_signed(self.expiry)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
            decided_at: None,
            replayed_at: None,
        };

        info!(
            approval_id = %record.id,
            resource = %record.request.resource_id(),
            operation = record.request.operation_id(),
            expires_at = %record.expires_at,
            "approval created"
        );
        self.records
            .insert(record.id, Arc::new(Mutex::new(record.clone())));
        record
    }

    fn slot(&self, id: &ApprovalId) -> ApprovalResult<Slot> {
        self.records
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ApprovalError::NotFound { id: *id })
    }

    /// Get a record by id.
    #[must_use]
    pub fn get(&self, id: &ApprovalId) -> Option<ApprovalRecord> {
        let slot = self.slot(id).ok()?;
        let record = lock(&slot).clone();
        Some(record)
    }

    /// Move a PENDING record to APPROVED or REJECTED.
    ///
    /// # Errors
    ///
    /// - [`ApprovalError::NotFound`] if the id is unknown
    /// - [`ApprovalError::Conflict`] if the record is already terminal
    /// - [`ApprovalError::Expired`] if the record is pending but past expiry;
    ///   the record is left for the sweep
    pub fn decide(
        &self,
        id: &ApprovalId,
        approver: &str,
        decision: HumanDecision,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> ApprovalResult<ApprovalRecord> {
        let slot = self.slot(id)?;
        let mut record = lock(&slot);

        if record.status.is_terminal() {
            return Err(ApprovalError::Conflict {
                id: *id,
                current: record.status,
            });
        }
        if record.is_overdue(now) {
            return Err(ApprovalError::Expired {
                id: *id,
                expires_at: record.expires_at,
            });
        }

        record.status = decision.target();
        record.approver = Some(approver.to_string());
        record.note = note;
        record.decided_at = Some(now);

        info!(
            approval_id = %id,
            approver,
            status = %record.status,
            "approval decided"
        );
        Ok(record.clone())
    }

    /// Move every overdue PENDING record to EXPIRED. Returns the ids moved.
    ///
    /// Running it again at the same `now` is a no-op.
    pub fn sweep(&self, now: DateTime<Utc>) -> Vec<ApprovalId> {
        let slots: Vec<Slot> = self
            .records
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut expired = Vec::new();
        for slot in slots {
            let mut record = lock(&slot);
            if record.is_overdue(now) {
                record.status = ApprovalStatus::Expired;
                record.decided_at = Some(now);
                expired.push(record.id);
            }
        }

        if !expired.is_empty() {
            info!(count = expired.len(), "expired pending approvals");
        }
        expired
    }

    /// Mark an APPROVED record as replayed and return it.
    ///
    /// Succeeds at most once per record.
    ///
    /// # Errors
    ///
    /// - [`ApprovalError::NotFound`] if the id is unknown
    /// - [`ApprovalError::Conflict`] if the record is not APPROVED
    /// - [`ApprovalError::AlreadyReplayed`] on the second call
    pub fn claim_replay(&self, id: &ApprovalId, now: DateTime<Utc>) -> ApprovalResult<ApprovalRecord> {
        let slot = self.slot(id)?;
        let mut record = lock(&slot);

        if record.status != ApprovalStatus::Approved {
            return Err(ApprovalError::Conflict {
                id: *id,
                current: record.status,
            });
        }
        if record.replayed_at.is_some() {
            return Err(ApprovalError::AlreadyReplayed { id: *id });
        }

        record.replayed_at = Some(now);
        debug!(approval_id = %id, "approved request claimed for replay");
        Ok(record.clone())
    }

    /// All PENDING records, oldest first.
    #[must_use]
    pub fn list_pending(&self) -> Vec<ApprovalRecord> {
        self.list_by_status(ApprovalStatus::Pending)
    }

    /// All records with the given status, oldest first.
    #[must_use]
    pub fn list_by_status(&self, status: ApprovalStatus) -> Vec<ApprovalRecord> {
        let slots: Vec<Slot> = self
            .records
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        let mut out: Vec<ApprovalRecord> = slots
            .iter()
            .map(|slot| lock(slot).clone())
            .filter(|r| r.status == status)
            .collect();
        out.sort_by_key(|r| r.created_at);
        out
    }

    /// PENDING records that expire before `deadline`, soonest first.
    #[must_use]
    pub fn expiring_before(&self, deadline: DateTime<Utc>) -> Vec<ApprovalRecord> {
        let mut out: Vec<ApprovalRecord> = self
            .list_pending()
            .into_iter()
            .filter(|r| r.expires_at < deadline)
            .collect();
        out.sort_by_key(|r| r.expires_at);
        out
    }

    /// Number of records in any status.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

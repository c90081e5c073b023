//! The append-only audit log.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use warden_core::{AuditRecordId, ResourceId};

use crate::error::AuditResult;
use crate::record::{AuditRecord, ExecutionRecord, ExecutionResult};
use crate::storage::{AuditStorage, MemoryAuditStorage};

/// Append-only audit log over a pluggable [`AuditStorage`].
#[derive(Clone)]
pub struct AuditLog {
    storage: Arc<dyn AuditStorage>,
}

impl AuditLog {
    /// Create an audit log over a storage backend.
    #[must_use]
    pub fn with_storage(storage: Arc<dyn AuditStorage>) -> Self {
        Self { storage }
    }

    /// Create an audit log backed by process memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_storage(Arc::new(MemoryAuditStorage::new()))
    }

    /// Append a decision record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage backend rejects the record.
    pub fn record(&self, record: &AuditRecord) -> AuditResult<AuditRecordId> {
        self.storage.append(record)?;
        info!(
            audit_id = %record.id,
            resource = %record.resource_id,
            operation = %record.operation_id,
            outcome = %record.outcome,
            policy_us = record.latency.policy_us,
            total_us = record.latency.total_us,
            "decision recorded"
        );
        Ok(record.id)
    }

    /// Claim a record for execution. Succeeds for exactly one caller.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist, was already claimed,
    /// or already has a result.
    pub fn claim_execution(&self, id: &AuditRecordId) -> AuditResult<()> {
        self.storage.claim_execution(id)
    }

    /// Attach the execution result to a record. Succeeds at most once per record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record does not exist or already has a result.
    pub fn attach_execution(
        &self,
        id: &AuditRecordId,
        result: ExecutionResult,
        at: DateTime<Utc>,
    ) -> AuditResult<()> {
        debug!(audit_id = %id, ?result, "attaching execution result");
        self.storage.attach_execution(id, ExecutionRecord {
            result,
            attached_at: at,
        })
    }

    /// Get a record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    pub fn get(&self, id: &AuditRecordId) -> AuditResult<Option<AuditRecord>> {
        self.storage.get(id)
    }

    /// All records for a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    pub fn for_resource(&self, resource: &ResourceId) -> AuditResult<Vec<AuditRecord>> {
        self.storage.by_resource(resource)
    }

    /// Records created within `[start, end]`.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    pub fn between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AuditResult<Vec<AuditRecord>> {
        self.storage.in_range(start, end)
    }

    /// Total number of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    pub fn count(&self) -> AuditResult<usize> {
        self.storage.count()
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog").finish_non_exhaustive()
    }
}

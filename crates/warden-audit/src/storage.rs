//! Audit storage trait and in-memory implementation.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use warden_core::{AuditRecordId, ResourceId};

use crate::error::{AuditError, AuditResult};
use crate::record::{AuditRecord, ExecutionRecord};

/// Storage backend for audit records.
///
/// Implementations must be thread-safe and append-only: a stored record is
/// never replaced, and its execution result is set at most once.
pub trait AuditStorage: Send + Sync {
    /// Append a record.
    ///
    /// # Errors
    ///
    /// Returns an error if the record cannot be persisted or its id already exists.
    fn append(&self, record: &AuditRecord) -> AuditResult<()>;

    /// Get a record by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    fn get(&self, id: &AuditRecordId) -> AuditResult<Option<AuditRecord>>;

    /// Reserve the right to execute a record.
    ///
    /// The first claim for a record wins; every later claim fails, so at
    /// most one caller ever reaches the upstream for it.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::RecordNotFound`],
    /// [`AuditError::ExecutionClaimed`], or
    /// [`AuditError::ExecutionAlreadyAttached`].
    fn claim_execution(&self, id: &AuditRecordId) -> AuditResult<()>;

    /// Attach the execution result to a record.
    ///
    /// # Errors
    ///
    /// Returns [`AuditError::RecordNotFound`] or
    /// [`AuditError::ExecutionAlreadyAttached`].
    fn attach_execution(&self, id: &AuditRecordId, execution: ExecutionRecord)
    -> AuditResult<()>;

    /// All records for a resource, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    fn by_resource(&self, resource: &ResourceId) -> AuditResult<Vec<AuditRecord>>;

    /// Records created within `[start, end]`, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if retrieval fails.
    fn in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AuditResult<Vec<AuditRecord>>;

    /// Total number of records.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails.
    fn count(&self) -> AuditResult<usize>;
}

#[derive(Debug, Default)]
struct Inner {
    records: Vec<AuditRecord>,
    index: HashMap<AuditRecordId, usize>,
    claimed: HashSet<AuditRecordId>,
}

/// In-process audit storage.
#[derive(Debug, Default)]
pub struct MemoryAuditStorage {
    inner: RwLock<Inner>,
}

impl MemoryAuditStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(|e| {
            tracing::warn!("audit storage lock was poisoned, recovering");
            e.into_inner()
        })
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(|e| {
            tracing::warn!("audit storage lock was poisoned, recovering");
            e.into_inner()
        })
    }
}

impl AuditStorage for MemoryAuditStorage {
    fn append(&self, record: &AuditRecord) -> AuditResult<()> {
        let mut inner = self.write();
        if inner.index.contains_key(&record.id) {
            return Err(AuditError::StorageError(format!(
                "audit record {} already exists",
                record.id
            )));
        }
        let position = inner.records.len();
        inner.records.push(record.clone());
        inner.index.insert(record.id, position);
        Ok(())
    }

    fn get(&self, id: &AuditRecordId) -> AuditResult<Option<AuditRecord>> {
        let inner = self.read();
        Ok(inner
            .index
            .get(id)
            .and_then(|&i| inner.records.get(i))
            .cloned())
    }

    fn claim_execution(&self, id: &AuditRecordId) -> AuditResult<()> {
        let mut inner = self.write();
        let attached = inner
            .index
            .get(id)
            .and_then(|&i| inner.records.get(i))
            .ok_or_else(|| AuditError::RecordNotFound {
                record_id: id.to_string(),
            })?
            .execution
            .is_some();
        if attached {
            return Err(AuditError::ExecutionAlreadyAttached {
                record_id: id.to_string(),
            });
        }
        if !inner.claimed.insert(*id) {
            return Err(AuditError::ExecutionClaimed {
                record_id: id.to_string(),
            });
        }
        Ok(())
    }

    fn attach_execution(
        &self,
        id: &AuditRecordId,
        execution: ExecutionRecord,
    ) -> AuditResult<()> {
        let mut inner = self.write();
        let position = *inner.index.get(id).ok_or_else(|| AuditError::RecordNotFound {
            record_id: id.to_string(),
        })?;
        let record = inner
            .records
            .get_mut(position)
            .ok_or_else(|| AuditError::RecordNotFound {
                record_id: id.to_string(),
            })?;
        if record.execution.is_some() {
            return Err(AuditError::ExecutionAlreadyAttached {
                record_id: id.to_string(),
            });
        }
        record.execution = Some(execution);
        Ok(())
    }

    fn by_resource(&self, resource: &ResourceId) -> AuditResult<Vec<AuditRecord>> {
        Ok(self
            .read()
            .records
            .iter()
            .filter(|r| &r.resource_id == resource)
            .cloned()
            .collect())
    }

    fn in_range(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> AuditResult<Vec<AuditRecord>> {
        Ok(self
            .read()
            .records
            .iter()
            .filter(|r| r.created_at >= start && r.created_at <= end)
            .cloned()
            .collect())
    }

    fn count(&self) -> AuditResult<usize> {
        Ok(self.read().records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{ExecutionResult, PolicyOutcome};
    use chrono::Duration;
    use warden_core::{HttpVerb, InvocationRequest, Outcome};

    fn record(resource: &str, at: DateTime<Utc>) -> AuditRecord {
        let request = InvocationRequest::new(resource, "op", HttpVerb::Get, "/x");
        AuditRecord::new(
            &request,
            PolicyOutcome {
                allowed: true,
                requires_approval: false,
                violations: Vec::new(),
                evaluated: Vec::new(),
                config_version: 0,
            },
            Outcome::Allow,
            vec!["ok".to_string()],
            at,
        )
    }

    fn executed() -> ExecutionRecord {
        ExecutionRecord {
            result: ExecutionResult::Executed {
                summary: "200".to_string(),
            },
            attached_at: Utc::now(),
        }
    }

    #[test]
    fn test_append_and_get() {
        let storage = MemoryAuditStorage::new();
        let r = record("shop", Utc::now());
        storage.append(&r).unwrap();

        assert_eq!(storage.get(&r.id).unwrap(), Some(r.clone()));
        assert_eq!(storage.count().unwrap(), 1);
        assert!(storage.append(&r).is_err());
    }

    #[test]
    fn test_attach_execution_once() {
        let storage = MemoryAuditStorage::new();
        let r = record("shop", Utc::now());
        storage.append(&r).unwrap();

        storage.attach_execution(&r.id, executed()).unwrap();
        let err = storage.attach_execution(&r.id, executed()).unwrap_err();
        assert!(matches!(err, AuditError::ExecutionAlreadyAttached { .. }));

        let stored = storage.get(&r.id).unwrap().unwrap();
        assert!(stored.execution.is_some());
    }

    #[test]
    fn test_claim_execution_once() {
        let storage = MemoryAuditStorage::new();
        let r = record("shop", Utc::now());
        storage.append(&r).unwrap();

        storage.claim_execution(&r.id).unwrap();
        let err = storage.claim_execution(&r.id).unwrap_err();
        assert!(matches!(err, AuditError::ExecutionClaimed { .. }));

        storage.attach_execution(&r.id, executed()).unwrap();
        let err = storage.claim_execution(&r.id).unwrap_err();
        assert!(matches!(err, AuditError::ExecutionAlreadyAttached { .. }));

        let missing = storage.claim_execution(&AuditRecordId::new()).unwrap_err();
        assert!(matches!(missing, AuditError::RecordNotFound { .. }));
    }

    #[test]
    fn test_concurrent_claims_have_one_winner() {
        let storage = std::sync::Arc::new(MemoryAuditStorage::new());
        let r = record("shop", Utc::now());
        storage.append(&r).unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let storage = std::sync::Arc::clone(&storage);
                let id = r.id;
                std::thread::spawn(move || storage.claim_execution(&id).is_ok())
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }

    #[test]
    fn test_attach_to_missing_record() {
        let storage = MemoryAuditStorage::new();
        let err = storage
            .attach_execution(&AuditRecordId::new(), executed())
            .unwrap_err();
        assert!(matches!(err, AuditError::RecordNotFound { .. }));
    }

    #[test]
    fn test_query_by_resource_and_range() {
        let storage = MemoryAuditStorage::new();
        let now = Utc::now();
        let old = now.checked_sub_signed(Duration::hours(2)).unwrap();

        storage.append(&record("shop", old)).unwrap();
        storage.append(&record("shop", now)).unwrap();
        storage.append(&record("crm", now)).unwrap();

        assert_eq!(storage.by_resource(&ResourceId::new("shop")).unwrap().len(), 2);
        let start = now.checked_sub_signed(Duration::minutes(1)).unwrap();
        assert_eq!(storage.in_range(start, now).unwrap().len(), 2);
    }
}

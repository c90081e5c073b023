//! Audit-related error types.

use thiserror::Error;

/// Errors that can occur with audit logging.
#[derive(Debug, Error)]
pub enum AuditError {
    /// Storage backend failure.
    #[error("storage error: {0}")]
    StorageError(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// No record with this id.
    #[error("audit record not found: {record_id}")]
    RecordNotFound {
        /// The record ID that was not found.
        record_id: String,
    },

    /// Another caller already claimed execution of this record.
    #[error("execution of audit record {record_id} was already claimed")]
    ExecutionClaimed {
        /// The claimed record.
        record_id: String,
    },

    /// The execution result was already attached.
    #[error("execution result already attached to audit record {record_id}")]
    ExecutionAlreadyAttached {
        /// The record that already carries a result.
        record_id: String,
    },
}

/// Result type for audit operations.
pub type AuditResult<T> = Result<T, AuditError>;

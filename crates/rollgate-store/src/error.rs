//! Error types for the Rollgate job store.

use thiserror::Error;

/// Result type alias for job store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during job store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("transaction error: {0}")]
    Transaction(String),

    #[error("table error: {0}")]
    Table(String),

    #[error("read error: {0}")]
    Read(String),

    #[error("write error: {0}")]
    Write(String),

    #[error("serialization error: {0}")]
    Serialize(String),

    #[error("deserialization error: {0}")]
    Deserialize(String),

    #[error("job not found: {0}")]
    NotFound(String),

    #[error("invalid status transition for job {id}: {from:?} -> {to:?}")]
    InvalidTransition {
        id: String,
        from: crate::types::JobStatus,
        to: crate::types::JobStatus,
    },

    #[error("discovered fields already set for job {0}")]
    DiscoveredAlreadySet(String),
}

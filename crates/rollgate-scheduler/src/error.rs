//! Scheduler error types.

use thiserror::Error;

/// Result type alias for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors that can occur submitting or waiting on jobs.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no processor registered; scheduler not started")]
    NoProcessor,

    #[error("timed out waiting for job {0} to reach a terminal status")]
    WaitTimeout(String),

    #[error("timed out waiting for the queue to drain")]
    DrainTimeout,

    #[error("job store error: {0}")]
    Store(#[from] rollgate_store::StoreError),
}

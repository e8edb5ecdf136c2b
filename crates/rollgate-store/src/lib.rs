//! rollgate-store — embedded job store for Rollgate.
//!
//! Backed by [redb](https://docs.rs/redb), holds the deployment job records
//! and owns the per-job execution log files. Job records are JSON-serialized
//! into redb's `&[u8]` value column and keyed by job id.
//!
//! The store enforces the job lifecycle invariants:
//!
//! - status moves only queued → running → {success | failed}
//! - terminal records are immutable
//! - discovered fields (compose path, service) are set at most once
//! - records are never deleted (audit retention)
//!
//! `JobStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`) and
//! can be shared across async tasks.

pub mod error;
pub mod log;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use log::{ExecutionLog, LogDir};
pub use store::{JobFilter, JobStore};
pub use types::{JobRecord, JobStatus};

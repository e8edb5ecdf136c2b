//! rollgate-scheduler — serialized deployment execution.
//!
//! The scheduler is the sole concurrency-control mechanism in Rollgate:
//! every deployment runs through one FIFO queue drained by one worker, so
//! container mutations for a service never overlap. The executor runs the
//! pipeline (discover → validate → pull → rollout) for one job at a time,
//! owns that job's record and execution log, and hands the terminal result
//! to the notifier.
//!
//! The scheduler is an explicit instance owned by the process and passed to
//! the request layer by reference; tests run isolated instances.

pub mod error;
pub mod executor;
pub mod queue;

pub use error::{SchedulerError, SchedulerResult};
pub use executor::Executor;
pub use queue::{Processor, ProcessorFuture, QueuedJob, Scheduler};

//! The FIFO job queue and its single worker.
//!
//! `submit` enqueues and returns immediately; one spawned worker drains the
//! channel in submission order, so job N reaches its terminal state before
//! job N+1 starts. A per-job failure is logged at the worker boundary and
//! never stalls the backlog.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info};

use rollgate_store::{JobRecord, JobStore, StoreError};

use crate::error::{SchedulerError, SchedulerResult};

/// Interval between store polls while waiting on a job.
pub const JOB_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Interval between backlog checks while waiting for drain.
pub const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Ephemeral work item; lives only in the worker channel.
#[derive(Debug, Clone)]
pub struct QueuedJob {
    pub job_id: String,
    pub app: String,
    pub image_ref: String,
}

/// Future returned by a processor invocation.
pub type ProcessorFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

/// The function the worker runs for each dequeued job.
pub type Processor = Arc<dyn Fn(QueuedJob) -> ProcessorFuture + Send + Sync>;

/// FIFO deployment queue with a single worker.
pub struct Scheduler {
    store: JobStore,
    tx: OnceLock<mpsc::UnboundedSender<QueuedJob>>,
    /// Queued plus running jobs. Zero means drained.
    outstanding: Arc<AtomicUsize>,
}

impl Scheduler {
    pub fn new(store: JobStore) -> Self {
        Self {
            store,
            tx: OnceLock::new(),
            outstanding: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn store(&self) -> &JobStore {
        &self.store
    }

    /// Register the processor and start the worker. Effective once; a
    /// second call keeps the first worker.
    pub fn start(&self, processor: Processor) {
        let (tx, mut rx) = mpsc::unbounded_channel::<QueuedJob>();
        if self.tx.set(tx).is_err() {
            tracing::warn!("scheduler already started");
            return;
        }

        let outstanding = self.outstanding.clone();
        tokio::spawn(async move {
            info!("scheduler worker started");
            while let Some(queued) = rx.recv().await {
                let job_id = queued.job_id.clone();
                // Per-job boundary: one bad job must not stall the backlog.
                if let Err(e) = processor(queued).await {
                    error!(job = %job_id, error = %e, "job execution failed");
                }
                outstanding.fetch_sub(1, Ordering::SeqCst);
            }
            info!("scheduler worker stopped");
        });
    }

    /// Enqueue a deployment job. Returns immediately with the queued record;
    /// fails fast if no processor was registered.
    pub fn submit(&self, app: &str, image_ref: &str) -> SchedulerResult<JobRecord> {
        let tx = self.tx.get().ok_or(SchedulerError::NoProcessor)?;

        let job = JobRecord::new(app, image_ref);
        self.store.insert(&job)?;

        self.outstanding.fetch_add(1, Ordering::SeqCst);
        let queued = QueuedJob {
            job_id: job.id.clone(),
            app: job.app.clone(),
            image_ref: job.image_ref.clone(),
        };
        if tx.send(queued).is_err() {
            self.outstanding.fetch_sub(1, Ordering::SeqCst);
            return Err(SchedulerError::NoProcessor);
        }

        info!(job = %job.id, %app, %image_ref, "job queued");
        Ok(job)
    }

    /// Poll the store until the job is terminal or the timeout elapses.
    pub async fn wait_for_job(&self, id: &str, timeout: Duration) -> SchedulerResult<JobRecord> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            match self.store.get(id)? {
                Some(job) if job.status.is_terminal() => return Ok(job),
                Some(_) => {}
                None => return Err(SchedulerError::Store(StoreError::NotFound(id.to_string()))),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(SchedulerError::WaitTimeout(id.to_string()));
            }
            tokio::time::sleep(JOB_POLL_INTERVAL).await;
        }
    }

    /// Block until no job is running and the backlog is empty, or time out.
    /// Used for graceful shutdown.
    pub async fn wait_for_drain(&self, timeout: Duration) -> SchedulerResult<()> {
        let deadline = tokio::time::Instant::now() + timeout;
        while self.outstanding.load(Ordering::SeqCst) > 0 {
            if tokio::time::Instant::now() >= deadline {
                return Err(SchedulerError::DrainTimeout);
            }
            tokio::time::sleep(DRAIN_POLL_INTERVAL).await;
        }
        Ok(())
    }
}

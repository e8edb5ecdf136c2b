//! The job executor — runs the pipeline for one job at a time.
//!
//! Step order is strict: discover, confirm the discovered service matches
//! the requested app, persist the discovery result, validate, pull, rollout.
//! The first failure aborts everything after it. The executor is the sole
//! catcher: any step error becomes a terminal failed status plus message,
//! and nothing escapes to crash the worker.

use std::sync::Arc;

use tracing::info;

use rollgate_deploy::{
    discover, pull, rollout, validate, ComposeCli, DeployError, DeployResult, RolloutOptions,
    RolloutTarget,
};
use rollgate_engine::EngineClient;
use rollgate_notify::Notifier;
use rollgate_store::{ExecutionLog, JobStatus, JobStore, LogDir};

use crate::queue::{Processor, ProcessorFuture, QueuedJob};

/// Runs the deployment pipeline for dequeued jobs.
pub struct Executor {
    engine: EngineClient,
    compose: ComposeCli,
    store: JobStore,
    logs: LogDir,
    notifier: Notifier,
    rollout_opts: RolloutOptions,
}

impl Executor {
    pub fn new(engine: EngineClient, store: JobStore, logs: LogDir, notifier: Notifier) -> Self {
        Self {
            engine,
            compose: ComposeCli::new(),
            store,
            logs,
            notifier,
            rollout_opts: RolloutOptions::default(),
        }
    }

    /// Substitute the compose CLI (tests, alternative engines).
    pub fn with_compose(mut self, compose: ComposeCli) -> Self {
        self.compose = compose;
        self
    }

    /// Override the rollout tunables.
    pub fn with_rollout_options(mut self, opts: RolloutOptions) -> Self {
        self.rollout_opts = opts;
        self
    }

    /// Wrap into the callback the scheduler's worker drives.
    pub fn into_processor(self) -> Processor {
        let executor = Arc::new(self);
        Arc::new(move |queued: QueuedJob| {
            let executor = executor.clone();
            let fut: ProcessorFuture = Box::pin(async move { executor.execute(queued).await });
            fut
        })
    }

    async fn execute(&self, queued: QueuedJob) -> anyhow::Result<()> {
        let log = self.logs.open(&queued.job_id);
        log.append(&format!(
            "[executor] Starting deployment: {} @ {}",
            queued.app, queued.image_ref
        ));
        self.store.update_status(&queued.job_id, JobStatus::Running, None)?;

        match self.run_pipeline(&queued, &log).await {
            Ok(()) => {
                log.append(&format!("[executor] Deployment successful: {}", queued.app));
                self.store.update_status(&queued.job_id, JobStatus::Success, None)?;
            }
            Err(e) => {
                let message = e.to_string();
                log.append(&format!("[executor] ERROR: {message}"));
                self.store
                    .update_status(&queued.job_id, JobStatus::Failed, Some(&message))?;
            }
        }

        // Reload the terminal record; the notifier's own failures are caught
        // per channel and never affect job status.
        if let Some(job) = self.store.get(&queued.job_id)? {
            info!(job = %job.id, status = ?job.status, "job finished");
            self.notifier
                .notify(&job, &self.logs.path_for(&queued.job_id))
                .await;
        }
        Ok(())
    }

    async fn run_pipeline(&self, queued: &QueuedJob, log: &ExecutionLog) -> DeployResult<()> {
        let discovered = discover(&self.engine, &queued.image_ref, log).await?;

        if discovered.service != queued.app {
            return Err(DeployError::Discovery(format!(
                "discovered service {:?} does not match requested app {:?}",
                discovered.service, queued.app
            )));
        }

        self.store
            .set_discovered(&queued.job_id, &discovered.compose_path, &discovered.service)
            .map_err(|e| DeployError::Discovery(format!("failed to persist discovery result: {e}")))?;

        validate(&queued.image_ref, &discovered.compose_path, log)?;

        pull(&self.engine, &queued.image_ref, log).await?;

        let target = RolloutTarget {
            compose_path: discovered.compose_path.clone().into(),
            project: discovered.project.clone(),
            service: discovered.service.clone(),
            image_ref: queued.image_ref.clone(),
        };
        rollout(
            &self.engine,
            &self.compose,
            &target,
            &queued.job_id,
            &self.rollout_opts,
            log,
        )
        .await
    }
}

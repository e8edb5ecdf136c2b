//! The rolling-rollout algorithm.
//!
//! Old and new containers run side by side: snapshot the old set, scale the
//! service to double its size (or to one, on a first deploy), gate every new
//! container on its healthcheck, then stop and remove the old set. Any
//! failure after the scale-up step rolls the new containers back and leaves
//! the old ones serving.
//!
//! The compose tool re-derives truth from label state on its next
//! invocation, so draining old containers directly through the engine API
//! does not confuse it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use rollgate_engine::{ContainerFilter, EngineClient, HealthStatus};
use rollgate_store::ExecutionLog;

use crate::compose::ComposeCli;
use crate::envfile::{image_env_key, set_env_line};
use crate::error::{DeployError, DeployResult};

/// Tunables for the rollout loops.
#[derive(Debug, Clone)]
pub struct RolloutOptions {
    /// How long one new container may take to report healthy.
    pub health_deadline: Duration,
    /// Interval between health probes of a new container.
    pub health_poll_interval: Duration,
    /// Lookup attempts for new containers after the scale command returns;
    /// the engine's container list can lag the compose invocation.
    pub lookup_retries: u32,
    /// Delay between lookup attempts.
    pub lookup_delay: Duration,
}

impl Default for RolloutOptions {
    fn default() -> Self {
        Self {
            health_deadline: Duration::from_secs(120),
            health_poll_interval: Duration::from_secs(1),
            lookup_retries: 10,
            lookup_delay: Duration::from_millis(500),
        }
    }
}

/// Everything the rollout needs to know about its target.
#[derive(Debug, Clone)]
pub struct RolloutTarget {
    pub compose_path: PathBuf,
    pub project: String,
    pub service: String,
    pub image_ref: String,
}

/// Scale target: run old and new side by side, or start a single replica on
/// a first-ever deploy.
pub fn scale_target(existing: usize) -> usize {
    if existing == 0 { 1 } else { existing * 2 }
}

/// Execute the rollout. The temp env file is always cleaned up, success or
/// failure.
pub async fn rollout(
    engine: &EngineClient,
    compose: &ComposeCli,
    target: &RolloutTarget,
    job_id: &str,
    opts: &RolloutOptions,
    log: &ExecutionLog,
) -> DeployResult<()> {
    let old: HashSet<String> = list_service_ids(engine, target).await?.into_iter().collect();
    let scale = scale_target(old.len());
    log.append(&format!(
        "[rollout] Service {} has {} running container(s); scaling to {scale}",
        target.service,
        old.len()
    ));

    let temp_env = write_temp_env(target, job_id).await?;
    log.append(&format!(
        "[rollout] Wrote temporary env file: {}",
        temp_env.display()
    ));

    let result = scale_and_cutover(engine, compose, target, scale, &old, &temp_env, opts, log).await;

    // Best-effort cleanup; never turns a finished rollout into a failure.
    if let Err(e) = tokio::fs::remove_file(&temp_env).await {
        log.append(&format!(
            "[rollout] Warning: failed to remove temp env file {}: {e}",
            temp_env.display()
        ));
        warn!(path = %temp_env.display(), error = %e, "temp env file not removed");
    }

    result
}

/// Merge the image reference into a job-scoped copy of the project's env
/// file. The user's file is never modified.
async fn write_temp_env(target: &RolloutTarget, job_id: &str) -> DeployResult<PathBuf> {
    let env_path = target
        .compose_path
        .parent()
        .unwrap_or_else(|| Path::new("/"))
        .join(".env");
    let existing = tokio::fs::read_to_string(&env_path).await.unwrap_or_default();

    let key = image_env_key(&target.service);
    let merged = set_env_line(&existing, &key, &target.image_ref);

    let temp_env = std::env::temp_dir().join(format!("rollgate-{job_id}.env"));
    tokio::fs::write(&temp_env, merged)
        .await
        .map_err(|e| DeployError::Rollout(format!("failed to write temp env file: {e}")))?;
    Ok(temp_env)
}

#[allow(clippy::too_many_arguments)]
async fn scale_and_cutover(
    engine: &EngineClient,
    compose: &ComposeCli,
    target: &RolloutTarget,
    scale: usize,
    old: &HashSet<String>,
    temp_env: &Path,
    opts: &RolloutOptions,
    log: &ExecutionLog,
) -> DeployResult<()> {
    // No new containers are confirmed yet, so a compose failure here needs
    // no rollback.
    log.append(&format!(
        "[rollout] Bringing up {} at scale {scale} (project {})",
        target.service, target.project
    ));
    compose
        .up_scaled(&target.compose_path, &target.project, &target.service, scale, temp_env)
        .await?;

    let new_ids = find_new_containers(engine, target, old, opts).await?;
    if new_ids.is_empty() {
        return Err(DeployError::Rollout(format!(
            "no new containers appeared for {} after scaling to {scale}",
            target.service
        )));
    }
    log.append(&format!(
        "[rollout] New containers: {}",
        new_ids.iter().map(|id| short_id(id)).collect::<Vec<_>>().join(", ")
    ));

    // Health-gate every new container; any failure past this point takes the
    // rollback path, including a missing healthcheck.
    for id in &new_ids {
        if let Err(e) = wait_until_healthy(engine, id, opts, log).await {
            rollback(engine, &new_ids, &e.to_string(), log).await;
            return Err(e);
        }
    }

    // Cutover: drain the old generation directly through the engine API.
    for id in old {
        log.append(&format!("[rollout] Draining old container {}", short_id(id)));
        engine.stop_container(id).await?;
        engine.remove_container(id).await?;
    }

    info!(service = %target.service, new = new_ids.len(), drained = old.len(), "rollout complete");
    log.append(&format!(
        "[rollout] Rollout complete: {} now serving {}",
        target.service, target.image_ref
    ));
    Ok(())
}

/// Current containers for the target minus the old snapshot, retried while
/// the engine's view catches up with the compose invocation.
async fn find_new_containers(
    engine: &EngineClient,
    target: &RolloutTarget,
    old: &HashSet<String>,
    opts: &RolloutOptions,
) -> DeployResult<Vec<String>> {
    let mut new_ids = Vec::new();
    for attempt in 0..=opts.lookup_retries {
        let current = list_service_ids(engine, target).await?;
        new_ids = current.into_iter().filter(|id| !old.contains(id)).collect();
        if !new_ids.is_empty() {
            break;
        }
        if attempt < opts.lookup_retries {
            tokio::time::sleep(opts.lookup_delay).await;
        }
    }
    Ok(new_ids)
}

/// Poll one container's healthcheck until healthy, unhealthy, or deadline.
async fn wait_until_healthy(
    engine: &EngineClient,
    id: &str,
    opts: &RolloutOptions,
    log: &ExecutionLog,
) -> DeployResult<()> {
    log.append(&format!(
        "[rollout] Waiting for container {} to become healthy",
        short_id(id)
    ));
    let deadline = Instant::now() + opts.health_deadline;
    loop {
        let detail = engine.inspect_container(id).await?;
        match detail.health_status() {
            None => {
                return Err(DeployError::Health(format!(
                    "container {} has no healthcheck configured; a healthcheck is required for rolling updates",
                    short_id(id)
                )));
            }
            Some(HealthStatus::Healthy) => {
                log.append(&format!("[rollout] Container {} is healthy", short_id(id)));
                return Ok(());
            }
            Some(HealthStatus::Unhealthy) => {
                return Err(DeployError::Health(format!(
                    "container {} reported unhealthy",
                    short_id(id)
                )));
            }
            Some(HealthStatus::Starting | HealthStatus::None) => {}
        }
        if Instant::now() >= deadline {
            return Err(DeployError::Health(format!(
                "container {} did not become healthy within {:?}",
                short_id(id),
                opts.health_deadline
            )));
        }
        tokio::time::sleep(opts.health_poll_interval).await;
    }
}

/// Best-effort removal of the containers created by this rollout. Old
/// containers are left untouched and continue serving.
async fn rollback(engine: &EngineClient, new_ids: &[String], reason: &str, log: &ExecutionLog) {
    log.append(&format!("[rollout] Rolling back: {reason}"));
    warn!(%reason, count = new_ids.len(), "rolling back new containers");
    for id in new_ids {
        if let Err(e) = engine.stop_container(id).await {
            log.append(&format!(
                "[rollout] Failed to stop container {} during rollback: {e}",
                short_id(id)
            ));
        }
        if let Err(e) = engine.remove_container(id).await {
            log.append(&format!(
                "[rollout] Failed to remove container {} during rollback: {e}",
                short_id(id)
            ));
        }
    }
    log.append("[rollout] Rollback finished; previous containers left running");
}

async fn list_service_ids(engine: &EngineClient, target: &RolloutTarget) -> DeployResult<Vec<String>> {
    let containers = engine
        .list_containers(&ContainerFilter::ComposeService {
            project: target.project.clone(),
            service: target.service.clone(),
        })
        .await?;
    Ok(containers.into_iter().map(|c| c.id).collect())
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(12)]
}

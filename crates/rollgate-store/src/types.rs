//! Domain types for the Rollgate job store.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

/// Unique identifier for a deployment job.
pub type JobId = String;

/// Lifecycle status of a deployment job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl JobStatus {
    /// Whether this status is terminal (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }

    /// Whether moving from `self` to `to` is a legal lifecycle step.
    ///
    /// Legal: queued → running, running → success, running → failed.
    pub fn can_transition_to(self, to: JobStatus) -> bool {
        matches!(
            (self, to),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Success)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

/// A persisted deployment job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JobRecord {
    pub id: JobId,
    /// Target app/service name as submitted.
    pub app: String,
    /// Requested image reference as submitted.
    pub image_ref: String,
    pub status: JobStatus,
    /// Compose file path discovered from the running container's labels.
    pub compose_path: Option<String>,
    /// Compose service name discovered from the running container's labels.
    pub service: Option<String>,
    /// Failure message; present only when status is failed.
    pub error: Option<String>,
    /// Unix timestamp (seconds) when this job was submitted.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last status change.
    pub updated_at: u64,
}

impl JobRecord {
    /// Create a fresh queued job with a random id.
    pub fn new(app: &str, image_ref: &str) -> Self {
        let now = epoch_secs();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            app: app.to_string(),
            image_ref: image_ref.to_string(),
            status: JobStatus::Queued,
            compose_path: None,
            service: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Current Unix epoch in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

//! Error types for the deployment pipeline.
//!
//! Each pipeline step raises exactly one descriptive error; the executor is
//! the sole catcher and converts any of these into a terminal failed job.

use thiserror::Error;

use rollgate_engine::EngineError;

/// Result type alias for pipeline steps.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can abort a deployment.
#[derive(Debug, Error)]
pub enum DeployError {
    /// Pre-flight rejection: bad image reference or compose path.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No matching container, missing compose labels, or service mismatch.
    #[error("discovery failed: {0}")]
    Discovery(String),

    /// Engine API failure (non-2xx, transport, timeout, pull error event).
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// The compose tool exited non-zero.
    #[error("compose exited with status {code}: {stderr}")]
    Compose { code: i32, stderr: String },

    /// Scale-up did not produce usable containers.
    #[error("rollout failed: {0}")]
    Rollout(String),

    /// Missing healthcheck, unhealthy container, or health-gate timeout.
    #[error("health gate failed: {0}")]
    Health(String),
}

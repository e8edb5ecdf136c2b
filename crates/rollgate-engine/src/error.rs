//! Error types for the engine client.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur talking to the container engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("engine API error {status} on {path}: {body}")]
    Api {
        status: u16,
        path: String,
        body: String,
    },

    #[error("engine transport error: {0}")]
    Transport(String),

    #[error("engine request timed out after {0:?}")]
    Timeout(Duration),

    #[error("image pull error: {0}")]
    Pull(String),

    #[error("unsupported DOCKER_HOST format: {0}")]
    Endpoint(String),

    #[error("engine response decode error: {0}")]
    Decode(String),
}

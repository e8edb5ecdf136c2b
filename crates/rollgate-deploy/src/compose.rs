//! Compose tool invocation.
//!
//! One process invocation per rollout: bring the service up at the target
//! scale without recreating the containers already running. The program is
//! overridable so tests can substitute a stub binary.

use std::path::Path;

use tokio::process::Command;
use tracing::debug;

use crate::error::{DeployError, DeployResult};

/// Handle on the compose CLI.
#[derive(Debug, Clone)]
pub struct ComposeCli {
    program: String,
}

impl Default for ComposeCli {
    fn default() -> Self {
        Self::new()
    }
}

impl ComposeCli {
    pub fn new() -> Self {
        Self {
            program: "docker".to_string(),
        }
    }

    /// Use a different program (tests, alternative engines).
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// `compose -f <file> -p <project> --env-file <env> up -d --no-recreate
    /// --scale <service>=<n> <service>`
    ///
    /// `--no-recreate` keeps the old containers serving while the new ones
    /// come up; the scale count covers both generations.
    pub async fn up_scaled(
        &self,
        compose_path: &Path,
        project: &str,
        service: &str,
        scale: usize,
        env_file: &Path,
    ) -> DeployResult<()> {
        debug!(%project, %service, scale, "invoking compose up");
        let output = Command::new(&self.program)
            .arg("compose")
            .arg("-f")
            .arg(compose_path)
            .arg("-p")
            .arg(project)
            .arg("--env-file")
            .arg(env_file)
            .arg("up")
            .arg("-d")
            .arg("--no-recreate")
            .arg("--scale")
            .arg(format!("{service}={scale}"))
            .arg(service)
            .output()
            .await
            .map_err(|e| DeployError::Compose {
                code: -1,
                stderr: format!("failed to spawn {}: {e}", self.program),
            })?;

        if !output.status.success() {
            return Err(DeployError::Compose {
                code: output.status.code().unwrap_or(-1),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }
}

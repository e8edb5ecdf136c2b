//! Daemon configuration file.
//!
//! TOML, all fields optional; CLI flags override file values, file values
//! override built-in defaults.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

use rollgate_notify::NotifyConfig;

/// Contents of `rollgate.toml`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Port the API server binds to.
    pub listen_port: Option<u16>,
    /// Directory for job records and execution logs.
    pub data_dir: Option<PathBuf>,
    /// Engine endpoint; falls back to `DOCKER_HOST` / the default socket.
    pub docker_host: Option<String>,
    /// Bearer token required on `/api` routes when set.
    pub auth_token: Option<String>,
    /// Outbound notification channels.
    pub notifications: NotifyConfig,
}

impl Config {
    /// Load and parse a config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        toml::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))
    }

    /// Load the file if it exists; defaults otherwise.
    pub fn load_optional(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }
}

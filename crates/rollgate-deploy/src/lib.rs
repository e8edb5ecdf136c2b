//! rollgate-deploy — the deployment pipeline steps.
//!
//! Everything that happens between "a job started running" and "the host is
//! serving the new image":
//!
//! - **discover** — resolve an image reference to the compose project,
//!   service, and config file that currently run it, from container labels
//! - **validate** — reject malformed image references and bad compose paths
//!   before any mutation begins
//! - **pull** — retrieve the image through the engine API, streaming
//!   filtered progress into the execution log
//! - **rollout** — scale up alongside the old containers, gate on
//!   healthchecks, drain the old set, roll back the new set on any
//!   post-scale failure
//!
//! Steps are plain async functions over an `EngineClient` and an
//! `ExecutionLog`; the executor (rollgate-scheduler) sequences them.

pub mod compose;
pub mod discover;
pub mod envfile;
pub mod error;
pub mod pull;
pub mod reference;
pub mod rollout;
pub mod validate;

pub use compose::ComposeCli;
pub use discover::{discover, Discovered};
pub use error::{DeployError, DeployResult};
pub use pull::pull;
pub use rollout::{rollout, RolloutOptions, RolloutTarget};
pub use validate::validate;

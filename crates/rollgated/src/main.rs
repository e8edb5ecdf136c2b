//! rollgated — the Rollgate daemon.
//!
//! Single binary that assembles the subsystems:
//! - Job store + execution logs (redb)
//! - Engine client (unix socket or TCP)
//! - Executor + FIFO scheduler (single worker)
//! - Notifier (webhook / Pushover)
//! - REST API (axum)
//!
//! # Usage
//!
//! ```text
//! rollgated --config /etc/rollgate/rollgate.toml --port 8315
//! ```
//!
//! On shutdown the daemon stops accepting requests and waits, up to a
//! bounded timeout, for the job queue to drain; killing a rollout
//! mid-scale-up would orphan containers.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::{info, warn};

use rollgate_api::ApiState;
use rollgate_engine::{EngineClient, EngineEndpoint};
use rollgate_notify::Notifier;
use rollgate_scheduler::{Executor, Scheduler};
use rollgate_store::{JobStore, LogDir};

mod config;
use config::Config;

const DEFAULT_PORT: u16 = 8315;
const DEFAULT_DATA_DIR: &str = "/var/lib/rollgate";

/// How long shutdown waits for in-flight and queued jobs.
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Parser)]
#[command(name = "rollgated", about = "Rollgate deployment daemon")]
struct Cli {
    /// Path to the TOML config file.
    #[arg(long, default_value = "/etc/rollgate/rollgate.toml")]
    config: PathBuf,

    /// Port to listen on (overrides the config file).
    #[arg(long)]
    port: Option<u16>,

    /// Data directory for job records and logs (overrides the config file).
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Engine endpoint, e.g. unix:///var/run/docker.sock or tcp://host:2375.
    #[arg(long)]
    docker_host: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,rollgate=debug".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load_optional(&cli.config)?;

    let port = cli.port.or(config.listen_port).unwrap_or(DEFAULT_PORT);
    let data_dir = cli
        .data_dir
        .or_else(|| config.data_dir.clone())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let docker_host = cli.docker_host.or_else(|| config.docker_host.clone());

    run(port, data_dir, docker_host, config).await
}

async fn run(
    port: u16,
    data_dir: PathBuf,
    docker_host: Option<String>,
    config: Config,
) -> anyhow::Result<()> {
    info!("rollgate daemon starting");

    std::fs::create_dir_all(&data_dir)?;

    // ── Initialize subsystems ──────────────────────────────────

    let db_path = data_dir.join("jobs.redb");
    let store = JobStore::open(&db_path)?;
    info!(path = ?db_path, "job store opened");

    let logs = LogDir::new(data_dir.join("logs"))?;

    let endpoint = match docker_host.as_deref() {
        Some(value) => EngineEndpoint::from_docker_host(Some(value))?,
        None => EngineEndpoint::from_env()?,
    };
    info!(?endpoint, "engine endpoint resolved");
    let engine = EngineClient::new(endpoint);

    let notifier = Notifier::new(config.notifications.clone());

    let executor = Executor::new(engine, store.clone(), logs.clone(), notifier);
    let scheduler = Arc::new(Scheduler::new(store));
    scheduler.start(executor.into_processor());
    info!("scheduler started");

    // ── Start API server ───────────────────────────────────────

    let state = ApiState {
        scheduler: scheduler.clone(),
        logs,
        token: config.auth_token.clone(),
    };
    let router = rollgate_api::build_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");

    // Graceful shutdown on Ctrl-C: stop accepting first, then drain.
    let server = axum::serve(listener, router).with_graceful_shutdown(async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        info!("shutdown signal received");
    });
    server.await?;

    info!("draining job queue before exit");
    match scheduler.wait_for_drain(SHUTDOWN_DRAIN_TIMEOUT).await {
        Ok(()) => info!("queue drained"),
        Err(e) => warn!(error = %e, "exiting with undrained jobs"),
    }

    info!("rollgate daemon stopped");
    Ok(())
}

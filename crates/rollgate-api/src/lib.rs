//! rollgate-api — REST surface for Rollgate.
//!
//! Thin consumer of the core-exposed operations; the deployment logic lives
//! entirely behind the scheduler.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/api/v1/deploy/{app}` | Trigger a rolling deployment |
//! | GET | `/api/v1/jobs` | List jobs (app/status/limit filters) |
//! | GET | `/api/v1/jobs/{id}` | Get one job |
//! | GET | `/api/v1/jobs/{id}/logs` | Retrieve the execution log |
//! | GET | `/healthz` | Liveness |
//!
//! `POST /deploy/{app}?wait=<secs>` blocks until the job is terminal.
//! When an auth token is configured, `/api` routes require
//! `Authorization: Bearer <token>`.

pub mod handlers;

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;

use rollgate_scheduler::Scheduler;
use rollgate_store::LogDir;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub scheduler: Arc<Scheduler>,
    pub logs: LogDir,
    /// Bearer token required on `/api` routes when set.
    pub token: Option<String>,
}

/// Build the complete router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/deploy/{app}", post(handlers::deploy))
        .route("/jobs", get(handlers::list_jobs))
        .route("/jobs/{id}", get(handlers::get_job))
        .route("/jobs/{id}/logs", get(handlers::get_job_logs))
        .layer(axum::middleware::from_fn_with_state(state.clone(), require_token))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
}

/// Reject `/api` requests lacking the configured bearer token.
async fn require_token(State(state): State<ApiState>, req: Request, next: Next) -> Response {
    if let Some(expected) = &state.token {
        let provided = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        if provided != Some(format!("Bearer {expected}").as_str()) {
            return handlers::error_response("unauthorized", StatusCode::UNAUTHORIZED);
        }
    }
    next.run(req).await
}

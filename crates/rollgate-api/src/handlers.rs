//! REST API handlers.
//!
//! Each handler goes through the scheduler or the job store and returns the
//! shared JSON envelope.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use rollgate_scheduler::SchedulerError;
use rollgate_store::{JobFilter, JobStatus};

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

pub(crate) fn error_response(msg: &str, status: StatusCode) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
        .into_response()
}

// ── Deploy ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct DeployRequest {
    pub image_ref: String,
}

#[derive(Deserialize, Default)]
pub struct DeployParams {
    /// Seconds to block for a terminal status; fire-and-forget when unset.
    pub wait: Option<u64>,
}

/// POST /api/v1/deploy/{app}
pub async fn deploy(
    State(state): State<ApiState>,
    Path(app): Path<String>,
    Query(params): Query<DeployParams>,
    Json(req): Json<DeployRequest>,
) -> impl IntoResponse {
    let job = match state.scheduler.submit(&app, &req.image_ref) {
        Ok(job) => job,
        Err(SchedulerError::NoProcessor) => {
            return error_response("scheduler not started", StatusCode::SERVICE_UNAVAILABLE)
        }
        Err(e) => return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    };

    match params.wait {
        None => (StatusCode::ACCEPTED, ApiResponse::ok(job)).into_response(),
        Some(secs) => {
            match state
                .scheduler
                .wait_for_job(&job.id, Duration::from_secs(secs))
                .await
            {
                Ok(done) => ApiResponse::ok(done).into_response(),
                Err(SchedulerError::WaitTimeout(_)) => {
                    error_response("job did not finish within the wait window", StatusCode::GATEWAY_TIMEOUT)
                }
                Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
            }
        }
    }
}

// ── Jobs ───────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct ListParams {
    pub app: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/v1/jobs
pub async fn list_jobs(
    State(state): State<ApiState>,
    Query(params): Query<ListParams>,
) -> impl IntoResponse {
    let status = match params.status.as_deref() {
        None => None,
        Some(raw) => match parse_status(raw) {
            Some(status) => Some(status),
            None => {
                return error_response(
                    &format!("unknown status filter: {raw}"),
                    StatusCode::BAD_REQUEST,
                )
            }
        },
    };

    let filter = JobFilter {
        app: params.app,
        status,
        limit: params.limit,
    };
    match state.scheduler.store().list(&filter) {
        Ok(jobs) => ApiResponse::ok(jobs).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// GET /api/v1/jobs/{id}
pub async fn get_job(State(state): State<ApiState>, Path(id): Path<String>) -> impl IntoResponse {
    match state.scheduler.store().get(&id) {
        Ok(Some(job)) => ApiResponse::ok(job).into_response(),
        Ok(None) => error_response("job not found", StatusCode::NOT_FOUND),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }
}

/// GET /api/v1/jobs/{id}/logs
pub async fn get_job_logs(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    // Resolve through the store first so unknown ids can never reach the
    // filesystem.
    match state.scheduler.store().get(&id) {
        Ok(Some(_)) => {}
        Ok(None) => return error_response("job not found", StatusCode::NOT_FOUND),
        Err(e) => return error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR),
    }

    let content = state.logs.open(&id).read();
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        content,
    )
        .into_response()
}

// ── Health ─────────────────────────────────────────────────────

/// GET /healthz
pub async fn healthz() -> impl IntoResponse {
    ApiResponse::ok(serde_json::json!({ "status": "ok" }))
}

fn parse_status(raw: &str) -> Option<JobStatus> {
    match raw {
        "queued" => Some(JobStatus::Queued),
        "running" => Some(JobStatus::Running),
        "success" => Some(JobStatus::Success),
        "failed" => Some(JobStatus::Failed),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use rollgate_scheduler::{Processor, ProcessorFuture, QueuedJob, Scheduler};
    use rollgate_store::{JobStore, LogDir};

    fn succeeding_processor(store: JobStore) -> Processor {
        Arc::new(move |queued: QueuedJob| {
            let store = store.clone();
            let fut: ProcessorFuture = Box::pin(async move {
                store.update_status(&queued.job_id, JobStatus::Running, None)?;
                store.update_status(&queued.job_id, JobStatus::Success, None)?;
                Ok(())
            });
            fut
        })
    }

    fn test_state(started: bool) -> (ApiState, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = JobStore::open_in_memory().unwrap();
        let scheduler = Scheduler::new(store.clone());
        if started {
            scheduler.start(succeeding_processor(store));
        }
        let state = ApiState {
            scheduler: Arc::new(scheduler),
            logs: LogDir::new(dir.path().join("logs")).unwrap(),
            token: None,
        };
        (state, dir)
    }

    #[tokio::test]
    async fn deploy_accepts_and_queues() {
        let (state, _dir) = test_state(true);
        let resp = deploy(
            State(state),
            Path("web".to_string()),
            Query(DeployParams::default()),
            Json(DeployRequest {
                image_ref: "registry.local/web:v2".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn deploy_with_wait_returns_terminal_job() {
        let (state, _dir) = test_state(true);
        let resp = deploy(
            State(state),
            Path("web".to_string()),
            Query(DeployParams { wait: Some(5) }),
            Json(DeployRequest {
                image_ref: "registry.local/web:v2".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn deploy_without_started_scheduler_is_unavailable() {
        let (state, _dir) = test_state(false);
        let resp = deploy(
            State(state),
            Path("web".to_string()),
            Query(DeployParams::default()),
            Json(DeployRequest {
                image_ref: "registry.local/web:v2".to_string(),
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn get_job_roundtrip_and_404() {
        let (state, _dir) = test_state(true);
        let job = state.scheduler.submit("web", "app:v1").unwrap();

        let resp = get_job(State(state.clone()), Path(job.id.clone()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = get_job(State(state), Path("nope".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn list_jobs_rejects_unknown_status() {
        let (state, _dir) = test_state(true);
        let resp = list_jobs(
            State(state),
            Query(ListParams {
                status: Some("exploded".to_string()),
                ..Default::default()
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn list_jobs_filters_by_app() {
        let (state, _dir) = test_state(true);
        state.scheduler.submit("web", "app:v1").unwrap();
        state.scheduler.submit("api", "other:v1").unwrap();

        let resp = list_jobs(
            State(state),
            Query(ListParams {
                app: Some("web".to_string()),
                ..Default::default()
            }),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn job_logs_404_for_unknown_job() {
        let (state, _dir) = test_state(true);
        let resp = get_job_logs(State(state), Path("nope".to_string()))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn job_logs_returns_plain_text() {
        let (state, _dir) = test_state(true);
        let job = state.scheduler.submit("web", "app:v1").unwrap();
        state.logs.open(&job.id).append("[executor] Starting");

        let resp = get_job_logs(State(state), Path(job.id)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        let resp = healthz().await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
    }
}

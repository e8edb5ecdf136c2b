//! EngineClient — one-request-per-call HTTP client for the engine API.
//!
//! Connects per request (unix socket or TCP), performs an HTTP/1.1
//! handshake, and drives the connection in a background task while the
//! response is consumed. Per-call timeouts are named constants; image pulls
//! get a much longer budget than control-plane calls.

use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use http_body_util::{BodyExt, Empty};
use hyper::body::Incoming;
use hyper::client::conn::http1;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use tokio::net::{TcpStream, UnixStream};
use tracing::debug;

use crate::error::{EngineError, EngineResult};
use crate::stream::{is_high_signal_status, parse_pull_event, LineBuffer};
use crate::types::{ContainerDetail, ContainerSummary, COMPOSE_PROJECT_LABEL, COMPOSE_SERVICE_LABEL};

/// Default engine socket when `DOCKER_HOST` is unset.
pub const DEFAULT_SOCKET_PATH: &str = "/var/run/docker.sock";

/// Timeout for control-plane calls (list, inspect, stop, remove).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for streamed image pulls; large images are slow.
pub const PULL_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Where the engine API lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEndpoint {
    /// Unix socket path.
    Unix(PathBuf),
    /// TCP `host:port` authority.
    Tcp(String),
}

impl EngineEndpoint {
    /// Parse a `DOCKER_HOST`-style value. Unset or empty falls back to the
    /// default unix socket; `unix://` and `tcp://` schemes are supported.
    pub fn from_docker_host(value: Option<&str>) -> EngineResult<Self> {
        match value {
            None | Some("") => Ok(Self::Unix(PathBuf::from(DEFAULT_SOCKET_PATH))),
            Some(v) if v.starts_with("unix://") => {
                Ok(Self::Unix(PathBuf::from(&v["unix://".len()..])))
            }
            Some(v) if v.starts_with("tcp://") => Ok(Self::Tcp(v["tcp://".len()..].to_string())),
            Some(v) => Err(EngineError::Endpoint(v.to_string())),
        }
    }

    /// Resolve from the process environment.
    pub fn from_env() -> EngineResult<Self> {
        Self::from_docker_host(std::env::var("DOCKER_HOST").ok().as_deref())
    }
}

/// Server-side filters for the container list endpoint.
#[derive(Debug, Clone)]
pub enum ContainerFilter {
    /// Containers created from the given image.
    Ancestor(String),
    /// Containers belonging to a compose (project, service) pair.
    ComposeService { project: String, service: String },
}

impl ContainerFilter {
    /// Encode as the engine's `filters` JSON parameter.
    fn to_json(&self) -> String {
        match self {
            Self::Ancestor(image) => serde_json::json!({ "ancestor": [image] }).to_string(),
            Self::ComposeService { project, service } => serde_json::json!({
                "label": [
                    format!("{COMPOSE_PROJECT_LABEL}={project}"),
                    format!("{COMPOSE_SERVICE_LABEL}={service}"),
                ]
            })
            .to_string(),
        }
    }
}

/// Client for the container engine API.
#[derive(Debug, Clone)]
pub struct EngineClient {
    endpoint: EngineEndpoint,
}

impl EngineClient {
    pub fn new(endpoint: EngineEndpoint) -> Self {
        Self { endpoint }
    }

    /// Client against the endpoint named by `DOCKER_HOST`.
    pub fn from_env() -> EngineResult<Self> {
        Ok(Self::new(EngineEndpoint::from_env()?))
    }

    /// List running containers matching the filter.
    pub async fn list_containers(
        &self,
        filter: &ContainerFilter,
    ) -> EngineResult<Vec<ContainerSummary>> {
        let path = format!("/containers/json?filters={}", query_escape(&filter.to_json()));
        self.get_json(&path).await
    }

    /// Inspect one container.
    pub async fn inspect_container(&self, id: &str) -> EngineResult<ContainerDetail> {
        let path = format!("/containers/{id}/json");
        self.get_json(&path).await
    }

    /// Stop a container. A 304 (already stopped) is success.
    pub async fn stop_container(&self, id: &str) -> EngineResult<()> {
        let path = format!("/containers/{id}/stop");
        self.expect_ok(Method::POST, &path, &[304]).await
    }

    /// Remove a container. A 404 (already removed) is success.
    pub async fn remove_container(&self, id: &str) -> EngineResult<()> {
        let path = format!("/containers/{id}");
        self.expect_ok(Method::DELETE, &path, &[404]).await
    }

    /// Pull an image, streaming NDJSON progress events.
    ///
    /// High-signal status lines are forwarded to `on_status`; an event
    /// carrying an error field aborts the pull.
    pub async fn pull_image(
        &self,
        from_image: &str,
        tag: Option<&str>,
        on_status: &mut (dyn FnMut(&str) + Send),
    ) -> EngineResult<()> {
        let mut path = format!("/images/create?fromImage={}", query_escape(from_image));
        if let Some(tag) = tag {
            path.push_str(&format!("&tag={}", query_escape(tag)));
        }

        let op = async {
            let resp = self.request(Method::POST, &path).await?;
            let status = resp.status();
            if !status.is_success() {
                let body = collect_body(resp).await?;
                return Err(api_error(status, &path, &body));
            }

            let mut body = resp.into_body();
            let mut buf = LineBuffer::new();
            while let Some(frame) = body.frame().await {
                let frame = frame.map_err(transport)?;
                if let Some(data) = frame.data_ref() {
                    for line in buf.push(data) {
                        handle_pull_line(&line, on_status)?;
                    }
                }
            }
            if let Some(line) = buf.finish() {
                handle_pull_line(&line, on_status)?;
            }
            Ok(())
        };

        tokio::time::timeout(PULL_TIMEOUT, op)
            .await
            .map_err(|_| EngineError::Timeout(PULL_TIMEOUT))?
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> EngineResult<T> {
        let op = async {
            let resp = self.request(Method::GET, path).await?;
            let status = resp.status();
            let body = collect_body(resp).await?;
            if !status.is_success() {
                return Err(api_error(status, path, &body));
            }
            serde_json::from_slice(&body).map_err(|e| EngineError::Decode(e.to_string()))
        };
        tokio::time::timeout(DEFAULT_TIMEOUT, op)
            .await
            .map_err(|_| EngineError::Timeout(DEFAULT_TIMEOUT))?
    }

    async fn expect_ok(
        &self,
        method: Method,
        path: &str,
        tolerated: &[u16],
    ) -> EngineResult<()> {
        let op = async {
            let resp = self.request(method, path).await?;
            let status = resp.status();
            if status.is_success() || tolerated.contains(&status.as_u16()) {
                return Ok(());
            }
            let body = collect_body(resp).await?;
            Err(api_error(status, path, &body))
        };
        tokio::time::timeout(DEFAULT_TIMEOUT, op)
            .await
            .map_err(|_| EngineError::Timeout(DEFAULT_TIMEOUT))?
    }

    async fn request(
        &self,
        method: Method,
        path_and_query: &str,
    ) -> EngineResult<Response<Incoming>> {
        let authority = match &self.endpoint {
            EngineEndpoint::Unix(_) => "localhost".to_string(),
            EngineEndpoint::Tcp(addr) => addr.clone(),
        };

        let mut sender = match &self.endpoint {
            EngineEndpoint::Unix(path) => {
                let stream = UnixStream::connect(path).await.map_err(transport)?;
                handshake(stream).await?
            }
            EngineEndpoint::Tcp(addr) => {
                let stream = TcpStream::connect(addr.as_str()).await.map_err(transport)?;
                handshake(stream).await?
            }
        };

        debug!(%method, path = %path_and_query, "engine request");

        let req = Request::builder()
            .method(method)
            .uri(format!("http://{authority}{path_and_query}"))
            .header(hyper::header::HOST, authority.as_str())
            .body(Empty::<Bytes>::new())
            .map_err(transport)?;

        sender.send_request(req).await.map_err(transport)
    }
}

async fn handshake<S>(stream: S) -> EngineResult<http1::SendRequest<Empty<Bytes>>>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let (sender, conn) = http1::handshake(io).await.map_err(transport)?;
    // Drive the connection in the background.
    tokio::spawn(async move {
        let _ = conn.await;
    });
    Ok(sender)
}

async fn collect_body(resp: Response<Incoming>) -> EngineResult<Bytes> {
    Ok(resp.into_body().collect().await.map_err(transport)?.to_bytes())
}

fn handle_pull_line(line: &str, on_status: &mut (dyn FnMut(&str) + Send)) -> EngineResult<()> {
    let Some(event) = parse_pull_event(line) else {
        return Ok(());
    };
    if let Some(err) = event.error {
        return Err(EngineError::Pull(err));
    }
    if let Some(status) = event.status {
        if is_high_signal_status(&status) {
            on_status(&status);
        }
    }
    Ok(())
}

fn transport<E: std::fmt::Display>(e: E) -> EngineError {
    EngineError::Transport(e.to_string())
}

fn api_error(status: StatusCode, path: &str, body: &[u8]) -> EngineError {
    EngineError::Api {
        status: status.as_u16(),
        path: path.to_string(),
        body: String::from_utf8_lossy(body).trim().to_string(),
    }
}

/// Percent-encode a query-string value (RFC 3986 unreserved set kept).
fn query_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

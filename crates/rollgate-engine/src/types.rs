//! Wire types for the engine API.
//!
//! Transient views deserialized from the engine's PascalCase JSON. Never
//! persisted; re-fetched from the engine on demand.

use std::collections::HashMap;

use serde::Deserialize;

/// Compose project label set by the compose tool on every container.
pub const COMPOSE_PROJECT_LABEL: &str = "com.docker.compose.project";
/// Compose service label.
pub const COMPOSE_SERVICE_LABEL: &str = "com.docker.compose.service";
/// Comma-separated list of compose config files for the project.
pub const COMPOSE_CONFIG_FILES_LABEL: &str = "com.docker.compose.project.config_files";

/// One entry from the container list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerSummary {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Image")]
    pub image: String,
    #[serde(rename = "Names", default)]
    pub names: Vec<String>,
    #[serde(rename = "Labels", default)]
    pub labels: HashMap<String, String>,
    #[serde(rename = "State", default)]
    pub state: String,
}

impl ContainerSummary {
    /// Primary container name with the engine's leading slash stripped.
    pub fn name(&self) -> &str {
        self.names
            .first()
            .map(|n| n.trim_start_matches('/'))
            .unwrap_or(&self.id)
    }
}

/// Full container detail from the inspect endpoint, reduced to the fields
/// the pipeline reads.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerDetail {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "State")]
    pub state: ContainerState,
    #[serde(rename = "Config")]
    pub config: ContainerConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerState {
    #[serde(rename = "Status", default)]
    pub status: String,
    /// Absent when the container has no healthcheck configured.
    #[serde(rename = "Health", default)]
    pub health: Option<HealthState>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthState {
    #[serde(rename = "Status")]
    pub status: HealthStatus,
    #[serde(rename = "FailingStreak", default)]
    pub failing_streak: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ContainerConfig {
    /// `null` when the container carries no labels at all.
    #[serde(rename = "Labels", default)]
    pub labels: Option<HashMap<String, String>>,
}

/// Healthcheck probe state as reported by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Starting,
    /// The engine reports "none" while a healthcheck-less container starts.
    None,
}

impl ContainerDetail {
    /// Probe status, or `None` when no healthcheck is configured.
    pub fn health_status(&self) -> Option<HealthStatus> {
        match self.state.health.as_ref().map(|h| h.status) {
            Some(HealthStatus::None) | None => None,
            some => some,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_deserializes_engine_payload() {
        let raw = r#"{
            "Id": "abc123",
            "Image": "registry.local/api:v1",
            "Names": ["/project-api-1"],
            "Labels": {"com.docker.compose.service": "api"},
            "State": "running"
        }"#;
        let summary: ContainerSummary = serde_json::from_str(raw).unwrap();
        assert_eq!(summary.id, "abc123");
        assert_eq!(summary.name(), "project-api-1");
        assert_eq!(
            summary.labels.get("com.docker.compose.service").unwrap(),
            "api"
        );
    }

    #[test]
    fn summary_tolerates_missing_optionals() {
        let raw = r#"{"Id": "abc", "Image": "app"}"#;
        let summary: ContainerSummary = serde_json::from_str(raw).unwrap();
        assert!(summary.names.is_empty());
        assert!(summary.labels.is_empty());
        assert_eq!(summary.name(), "abc");
    }

    #[test]
    fn detail_with_healthcheck() {
        let raw = r#"{
            "Id": "abc",
            "State": {"Status": "running", "Health": {"Status": "healthy", "FailingStreak": 0}},
            "Config": {"Labels": {"a": "b"}}
        }"#;
        let detail: ContainerDetail = serde_json::from_str(raw).unwrap();
        assert_eq!(detail.health_status(), Some(HealthStatus::Healthy));
    }

    #[test]
    fn detail_without_healthcheck() {
        let raw = r#"{
            "Id": "abc",
            "State": {"Status": "running"},
            "Config": {"Labels": null}
        }"#;
        let detail: ContainerDetail = serde_json::from_str(raw).unwrap();
        assert_eq!(detail.health_status(), None);
        assert!(detail.config.labels.is_none());
    }

    #[test]
    fn health_none_reads_as_no_healthcheck() {
        let raw = r#"{
            "Id": "abc",
            "State": {"Status": "running", "Health": {"Status": "none"}},
            "Config": {}
        }"#;
        let detail: ContainerDetail = serde_json::from_str(raw).unwrap();
        assert_eq!(detail.health_status(), None);
    }

    #[test]
    fn starting_and_unhealthy_statuses() {
        for (status, expected) in [
            ("starting", HealthStatus::Starting),
            ("unhealthy", HealthStatus::Unhealthy),
        ] {
            let raw = format!(
                r#"{{"Id": "x", "State": {{"Status": "running", "Health": {{"Status": "{status}"}}}}, "Config": {{}}}}"#
            );
            let detail: ContainerDetail = serde_json::from_str(&raw).unwrap();
            assert_eq!(detail.health_status(), Some(expected));
        }
    }
}

//! Service discovery from running containers.
//!
//! An incoming image reference names *what* to deploy; the compose project,
//! service, and config file that currently run it are read off a live
//! container's labels. Nothing is configured ahead of time: if a service was
//! ever started by the compose tool, it is discoverable.

use std::collections::HashMap;

use rollgate_engine::{
    ContainerFilter, ContainerSummary, EngineClient, COMPOSE_CONFIG_FILES_LABEL,
    COMPOSE_PROJECT_LABEL, COMPOSE_SERVICE_LABEL,
};
use rollgate_store::ExecutionLog;

use crate::error::{DeployError, DeployResult};
use crate::reference::bare_image_name;

/// What discovery resolves an image reference to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovered {
    /// First compose config file recorded for the project.
    pub compose_path: String,
    /// Compose service name.
    pub service: String,
    /// Compose project name.
    pub project: String,
}

/// Resolve an image reference to the compose coordinates currently running it.
pub async fn discover(
    engine: &EngineClient,
    image_ref: &str,
    log: &ExecutionLog,
) -> DeployResult<Discovered> {
    let image_name = bare_image_name(image_ref);
    log.append(&format!(
        "[discover] Searching for containers using image: {image_name}"
    ));

    let containers = engine
        .list_containers(&ContainerFilter::Ancestor(image_name.to_string()))
        .await?;

    let Some(matched) = find_matching_container(&containers, image_name) else {
        log.append(&format!(
            "[discover] No running containers found matching image: {image_name}"
        ));
        log.append("[discover] Hint: ensure the service was started at least once before deploying");
        log.append("[discover] Hint: the registry prefix must match exactly what the engine shows for the running container");
        return Err(DeployError::Discovery(format!(
            "no running container found matching image: {image_name}"
        )));
    };

    log.append(&format!(
        "[discover] Found container: {} (id: {})",
        matched.name(),
        short_id(&matched.id)
    ));

    let detail = engine.inspect_container(&matched.id).await?;
    let discovered = extract_compose_info(detail.config.labels.as_ref(), matched.name())?;

    log.append(&format!("[discover] Compose file: {}", discovered.compose_path));
    log.append(&format!("[discover] Service: {}", discovered.service));
    log.append("[discover] Discovery complete");

    Ok(discovered)
}

/// First container whose image is exactly `image_name` or `image_name:tag`.
///
/// The prefix match includes the colon so `my-app` never matches
/// `my-app-extra:v1`.
pub fn find_matching_container<'a>(
    containers: &'a [ContainerSummary],
    image_name: &str,
) -> Option<&'a ContainerSummary> {
    containers
        .iter()
        .find(|c| c.image == image_name || c.image.starts_with(&format!("{image_name}:")))
}

/// Read the compose coordinates out of a container's labels.
///
/// Every label is mandatory; each absence has its own error so the operator
/// can tell exactly which piece of compose metadata is missing.
pub fn extract_compose_info(
    labels: Option<&HashMap<String, String>>,
    container_name: &str,
) -> DeployResult<Discovered> {
    let Some(labels) = labels else {
        return Err(DeployError::Discovery(format!(
            "container {container_name} has no labels; it was not started by the compose tool"
        )));
    };

    // config_files may list several comma-separated paths when -f overrides
    // are in play; the first entry is the project's primary file.
    let compose_path = labels
        .get(COMPOSE_CONFIG_FILES_LABEL)
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .unwrap_or_default();
    if compose_path.is_empty() {
        return Err(DeployError::Discovery(format!(
            "container {container_name} is missing the {COMPOSE_CONFIG_FILES_LABEL} label"
        )));
    }

    let Some(service) = labels.get(COMPOSE_SERVICE_LABEL).filter(|s| !s.is_empty()) else {
        return Err(DeployError::Discovery(format!(
            "container {container_name} is missing the {COMPOSE_SERVICE_LABEL} label"
        )));
    };

    let Some(project) = labels.get(COMPOSE_PROJECT_LABEL).filter(|s| !s.is_empty()) else {
        return Err(DeployError::Discovery(format!(
            "container {container_name} is missing the {COMPOSE_PROJECT_LABEL} label"
        )));
    };

    Ok(Discovered {
        compose_path: compose_path.to_string(),
        service: service.clone(),
        project: project.clone(),
    })
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(12)]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(id: &str, image: &str) -> ContainerSummary {
        serde_json::from_value(serde_json::json!({
            "Id": id,
            "Image": image,
            "Names": [format!("/{id}")],
            "State": "running",
        }))
        .unwrap()
    }

    fn labels(entries: &[(&str, &str)]) -> HashMap<String, String> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn matches_exact_image() {
        let containers = vec![summary("c1", "my-app")];
        assert_eq!(
            find_matching_container(&containers, "my-app").unwrap().id,
            "c1"
        );
    }

    #[test]
    fn matches_tagged_image() {
        let containers = vec![summary("c1", "my-app:v3")];
        assert_eq!(
            find_matching_container(&containers, "my-app").unwrap().id,
            "c1"
        );
    }

    #[test]
    fn does_not_match_longer_image_name() {
        let containers = vec![summary("c1", "my-app-extra:v1")];
        assert!(find_matching_container(&containers, "my-app").is_none());
    }

    #[test]
    fn first_match_in_listing_order_wins() {
        let containers = vec![
            summary("other", "unrelated:v1"),
            summary("first", "my-app:v1"),
            summary("second", "my-app:v2"),
        ];
        assert_eq!(
            find_matching_container(&containers, "my-app").unwrap().id,
            "first"
        );
    }

    #[test]
    fn empty_candidate_list_yields_none() {
        assert!(find_matching_container(&[], "my-app").is_none());
    }

    #[test]
    fn extract_rejects_absent_labels() {
        let err = extract_compose_info(None, "web-1").unwrap_err();
        assert!(err.to_string().contains("has no labels"));
    }

    #[test]
    fn extract_rejects_missing_config_files() {
        let labels = labels(&[
            (COMPOSE_SERVICE_LABEL, "web"),
            (COMPOSE_PROJECT_LABEL, "shop"),
        ]);
        let err = extract_compose_info(Some(&labels), "web-1").unwrap_err();
        assert!(err.to_string().contains("config_files"));
    }

    #[test]
    fn extract_rejects_empty_config_files() {
        let labels = labels(&[
            (COMPOSE_CONFIG_FILES_LABEL, ""),
            (COMPOSE_SERVICE_LABEL, "web"),
            (COMPOSE_PROJECT_LABEL, "shop"),
        ]);
        let err = extract_compose_info(Some(&labels), "web-1").unwrap_err();
        assert!(err.to_string().contains("config_files"));
    }

    #[test]
    fn extract_rejects_missing_service() {
        let labels = labels(&[
            (COMPOSE_CONFIG_FILES_LABEL, "/srv/shop/compose.yml"),
            (COMPOSE_PROJECT_LABEL, "shop"),
        ]);
        let err = extract_compose_info(Some(&labels), "web-1").unwrap_err();
        assert!(err.to_string().contains("compose.service"));
    }

    #[test]
    fn extract_rejects_missing_project() {
        let labels = labels(&[
            (COMPOSE_CONFIG_FILES_LABEL, "/srv/shop/compose.yml"),
            (COMPOSE_SERVICE_LABEL, "web"),
        ]);
        let err = extract_compose_info(Some(&labels), "web-1").unwrap_err();
        assert!(err.to_string().contains("compose.project"));
    }

    #[test]
    fn extract_takes_first_config_file_trimmed() {
        let labels = labels(&[
            (
                COMPOSE_CONFIG_FILES_LABEL,
                "/srv/shop/compose.yml , /srv/shop/compose.override.yml",
            ),
            (COMPOSE_SERVICE_LABEL, "web"),
            (COMPOSE_PROJECT_LABEL, "shop"),
        ]);
        let discovered = extract_compose_info(Some(&labels), "web-1").unwrap();
        assert_eq!(discovered.compose_path, "/srv/shop/compose.yml");
        assert_eq!(discovered.service, "web");
        assert_eq!(discovered.project, "shop");
    }
}

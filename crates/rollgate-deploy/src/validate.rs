//! Pre-flight validation.
//!
//! Both checks run before any container state changes. The image-reference
//! pattern rejects whitespace and shell metacharacters: the reference later
//! reaches a compose process invocation and an env file, and must never be
//! able to smuggle anything into either.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use rollgate_store::ExecutionLog;

use crate::error::{DeployError, DeployResult};

/// Letters, digits, `.`, `-`, `:`, `/`, optionally followed by a
/// `@sha256:` digest of exactly 64 hex chars.
static IMAGE_REF_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9./:-]+(@sha256:[a-f0-9]{64})?$").expect("image ref pattern")
});

/// Validate the image reference and compose path; either failure aborts the
/// job before mutation.
pub fn validate(image_ref: &str, compose_path: &str, log: &ExecutionLog) -> DeployResult<()> {
    log.append(&format!("[validate] Checking image reference: {image_ref}"));
    validate_image_ref(image_ref)?;

    log.append(&format!("[validate] Checking compose file: {compose_path}"));
    validate_compose_path(compose_path)?;

    log.append("[validate] OK");
    Ok(())
}

/// Reject references outside the restrictive allowed-character pattern.
pub fn validate_image_ref(image_ref: &str) -> DeployResult<()> {
    if IMAGE_REF_PATTERN.is_match(image_ref) {
        Ok(())
    } else {
        Err(DeployError::Validation(format!(
            "invalid image reference: {image_ref:?}"
        )))
    }
}

/// The compose path must be absolute and exist on this host.
pub fn validate_compose_path(compose_path: &str) -> DeployResult<()> {
    let path = Path::new(compose_path);
    if !path.is_absolute() {
        return Err(DeployError::Validation(format!(
            "compose path is not absolute: {compose_path}"
        )));
    }
    if !path.exists() {
        return Err(DeployError::Validation(format!(
            "compose file does not exist: {compose_path}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_references() {
        for image_ref in [
            "nginx",
            "nginx:1.27",
            "registry.example.com/team/app:v1.2",
            "localhost:5001/app:v1",
        ] {
            assert!(validate_image_ref(image_ref).is_ok(), "{image_ref}");
        }
    }

    #[test]
    fn accepts_digest_reference() {
        let image_ref = format!("registry.local/app@sha256:{}", "0123456789abcdef".repeat(4));
        assert!(validate_image_ref(&image_ref).is_ok());
    }

    #[test]
    fn rejects_short_or_uppercase_digest() {
        let short = "app@sha256:abcd";
        assert!(validate_image_ref(short).is_err());

        let upper = format!("app@sha256:{}", "A".repeat(64));
        assert!(validate_image_ref(&upper).is_err());
    }

    #[test]
    fn rejects_whitespace_and_shell_metacharacters() {
        for image_ref in [
            "app:v1 extra",
            "app;rm -rf /",
            "app$(whoami)",
            "app`id`",
            "app|cat",
            "app&v1",
            "app\nv1",
            "app'v1",
            "",
        ] {
            assert!(validate_image_ref(image_ref).is_err(), "{image_ref:?}");
        }
    }

    #[test]
    fn rejects_relative_compose_path() {
        let err = validate_compose_path("compose.yml").unwrap_err();
        assert!(err.to_string().contains("not absolute"));
    }

    #[test]
    fn rejects_missing_compose_path() {
        let err = validate_compose_path("/definitely/not/here/compose.yml").unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn accepts_existing_absolute_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("compose.yml");
        std::fs::write(&path, "services: {}\n").unwrap();
        assert!(validate_compose_path(path.to_str().unwrap()).is_ok());
    }
}

//! Image reference parsing.
//!
//! Two closely related splits share the last-slash/colon rule so that port
//! numbers in registry hostnames (`localhost:5001/app`) survive intact:
//!
//! - `bare_image_name` strips the tag for container matching
//! - `pull_reference` produces the engine API's `fromImage`/`tag` pair

/// Strip the tag portion: after the last `/`, cut at the first `:`.
/// A reference with no tag colon is returned unchanged.
pub fn bare_image_name(image_ref: &str) -> &str {
    let after_slash = image_ref.rfind('/').map(|i| i + 1).unwrap_or(0);
    match image_ref[after_slash..].find(':') {
        Some(colon) => &image_ref[..after_slash + colon],
        None => image_ref,
    }
}

/// Split a reference into the engine's `fromImage` and `tag` parameters.
///
/// Digest-qualified references (`image@sha256:...`) are passed whole with no
/// separate tag; untagged references pull `latest`.
pub fn pull_reference(image_ref: &str) -> (String, Option<String>) {
    if image_ref.contains("@sha256:") {
        return (image_ref.to_string(), None);
    }
    let after_slash = image_ref.rfind('/').map(|i| i + 1).unwrap_or(0);
    match image_ref[after_slash..].rfind(':') {
        Some(colon) => (
            image_ref[..after_slash + colon].to_string(),
            Some(image_ref[after_slash + colon + 1..].to_string()),
        ),
        None => (image_ref.to_string(), Some("latest".to_string())),
    }
}

//! Env-file merging for compose interpolation.
//!
//! The rollout never edits the user's `.env`; it merges the image key into a
//! job-scoped temporary copy handed to the compose tool via `--env-file`.

/// Merge `KEY=VALUE` into env-file content.
///
/// Replaces the last existing `KEY=` line if present (env-file semantics:
/// the last occurrence wins, so that is the one to update), appends
/// otherwise. The file's trailing-newline convention is preserved either
/// way. Commented-out lines and longer keys sharing a prefix never match.
pub fn set_env_line(content: &str, key: &str, value: &str) -> String {
    let key_prefix = format!("{key}=");
    let new_line = format!("{key}={value}");

    let lines: Vec<&str> = content.split('\n').collect();
    if let Some(idx) = lines.iter().rposition(|l| l.starts_with(&key_prefix)) {
        let mut out: Vec<String> = lines.into_iter().map(str::to_string).collect();
        out[idx] = new_line;
        return out.join("\n");
    }

    if content.is_empty() {
        return new_line;
    }
    if content.ends_with('\n') {
        return format!("{content}{new_line}\n");
    }
    format!("{content}\n{new_line}")
}

/// The interpolation key a compose file uses for a service's image, e.g.
/// `image: ${WEB_IMAGE}` for service `web`. Uppercased, with every
/// non-alphanumeric mapped to `_`.
pub fn image_env_key(service: &str) -> String {
    let mut key: String = service
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    key.push_str("_IMAGE");
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_existing_key_preserving_siblings_and_trailing_newline() {
        let content = "A=1\nKEY=old\nB=2\n";
        assert_eq!(set_env_line(content, "KEY", "new"), "A=1\nKEY=new\nB=2\n");
    }

    #[test]
    fn replaces_without_trailing_newline() {
        let content = "A=1\nKEY=old";
        assert_eq!(set_env_line(content, "KEY", "new"), "A=1\nKEY=new");
    }

    #[test]
    fn appends_to_empty_content_without_newline() {
        assert_eq!(set_env_line("", "KEY", "VALUE"), "KEY=VALUE");
    }

    #[test]
    fn appends_with_trailing_newline_preserved() {
        assert_eq!(set_env_line("A=1\n", "KEY", "V"), "A=1\nKEY=V\n");
    }

    #[test]
    fn appending_to_unterminated_content_inserts_newline() {
        assert_eq!(set_env_line("A=1", "KEY", "V"), "A=1\nKEY=V");
    }

    #[test]
    fn commented_line_is_not_matched() {
        let content = "#KEY=old\nA=1\n";
        assert_eq!(set_env_line(content, "KEY", "new"), "#KEY=old\nA=1\nKEY=new\n");
    }

    #[test]
    fn longer_key_sharing_prefix_is_not_matched() {
        let content = "KEY_LONGER=x\n";
        assert_eq!(set_env_line(content, "KEY", "v"), "KEY_LONGER=x\nKEY=v\n");
    }

    #[test]
    fn duplicate_keys_replace_only_last_occurrence() {
        let content = "KEY=first\nA=1\nKEY=second\n";
        assert_eq!(
            set_env_line(content, "KEY", "new"),
            "KEY=first\nA=1\nKEY=new\n"
        );
    }

    #[test]
    fn image_key_for_simple_service() {
        assert_eq!(image_env_key("web"), "WEB_IMAGE");
    }

    #[test]
    fn image_key_maps_punctuation_to_underscore() {
        assert_eq!(image_env_key("api-gateway"), "API_GATEWAY_IMAGE");
        assert_eq!(image_env_key("my.svc"), "MY_SVC_IMAGE");
    }
}

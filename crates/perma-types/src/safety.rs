//! Cache path component validation.
//!
//! Valid components:
//! - Must be non-empty and at most 255 bytes
//! - Must not be `.` or `..`, and must not start with `.`
//! - Must not contain `/`, `\`, `:`, NUL, or any control character
//!
//! Invalid input is rejected, never sanitized: a reference that would land
//! outside the cache root is a caller error.

use crate::error::{TypeError, TypeResult};

/// Characters that are forbidden anywhere in a path component.
const FORBIDDEN_CHARS: &[char] = &['/', '\\', ':', '\0'];

const MAX_COMPONENT_LEN: usize = 255;

/// Validate a single path component, returning `Ok(())` if it is safe to
/// join onto a cache directory.
///
/// # Examples
///
/// ```
/// use perma_types::validate_component;
///
/// assert!(validate_component("user_id", "alice").is_ok());
/// assert!(validate_component("user_id", "../../etc").is_err());
/// assert!(validate_component("instance", "mastodon.social").is_ok());
/// ```
pub fn validate_component(field: &'static str, value: &str) -> TypeResult<()> {
    let reject = |reason: String| TypeError::PathSafety {
        field,
        value: value.to_string(),
        reason,
    };

    if value.is_empty() {
        return Err(reject("must not be empty".into()));
    }
    if value.len() > MAX_COMPONENT_LEN {
        return Err(reject(format!("longer than {MAX_COMPONENT_LEN} bytes")));
    }
    if value == "." || value == ".." {
        return Err(reject("must not be a relative directory".into()));
    }
    if value.starts_with('.') {
        return Err(reject("must not start with '.'".into()));
    }
    for ch in FORBIDDEN_CHARS {
        if value.contains(*ch) {
            return Err(reject(format!("contains forbidden character: {ch:?}")));
        }
    }
    if value.chars().any(char::is_control) {
        return Err(reject("contains a control character".into()));
    }

    Ok(())
}

/// Drop any query string or fragment from a media name or URL.
pub fn strip_query(value: &str) -> &str {
    let end = value.find(['?', '#']).unwrap_or(value.len());
    &value[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn accepts_ordinary_identifiers() {
        assert!(validate_component("user_id", "alice").is_ok());
        assert!(validate_component("user_id", "jack.bsky.social").is_ok());
        assert!(validate_component("post_id", "1234567890").is_ok());
        assert!(validate_component("post_id", "3kq2lyd5gqs2a").is_ok());
        assert!(validate_component("media", "GzX1_abc.jpg").is_ok());
    }

    #[test]
    fn rejects_traversal() {
        assert!(validate_component("user_id", "..").is_err());
        assert!(validate_component("user_id", "../../etc").is_err());
        assert!(validate_component("user_id", "a/../b").is_err());
        assert!(validate_component("user_id", ".hidden").is_err());
    }

    #[test]
    fn rejects_separators_and_qualifiers() {
        assert!(validate_component("instance", "host/evil").is_err());
        assert!(validate_component("instance", "host\\evil").is_err());
        assert!(validate_component("user_id", "did:plc:abc").is_err());
        assert!(validate_component("user_id", "nul\0byte").is_err());
        assert!(validate_component("user_id", "line\nbreak").is_err());
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(validate_component("post_id", "").is_err());
        assert!(validate_component("post_id", &"x".repeat(256)).is_err());
    }

    #[test]
    fn error_names_the_field() {
        let err = validate_component("user_id", "../x").unwrap_err();
        assert!(err.is_path_safety());
        assert!(err.to_string().contains("user_id"));
    }

    #[test]
    fn strip_query_drops_suffixes() {
        assert_eq!(strip_query("a.jpg?name=orig"), "a.jpg");
        assert_eq!(strip_query("a.jpg#frag"), "a.jpg");
        assert_eq!(strip_query("a.jpg"), "a.jpg");
    }

    proptest! {
        #[test]
        fn accepted_components_never_escape(value in "\\PC{0,40}") {
            if validate_component("any", &value).is_ok() {
                let joined = std::path::Path::new("root").join(&value);
                prop_assert_eq!(joined.components().count(), 2);
                prop_assert!(joined.starts_with("root"));
            }
        }
    }
}

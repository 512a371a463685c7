//! `ETag` generation and `If-None-Match` evaluation for static files.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Strong `ETag` derived from the file bytes, e.g. `"1f-9c0d2e..."`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}-{:x}\"", content.len(), hasher.finish())
}

/// True when the client's cached copy is current (respond 304).
///
/// Accepts a comma-separated list, `*`, and weak validators (`W/"..."`).
pub fn etag_matches(if_none_match: Option<&str>, etag: &str) -> bool {
    let Some(header) = if_none_match else {
        return false;
    };
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_etag_shape() {
        let etag = generate_etag(b"<html></html>");
        assert!(etag.starts_with("\"d-"));
        assert!(etag.ends_with('"'));
    }

    #[test]
    fn test_etag_is_stable_and_content_sensitive() {
        assert_eq!(generate_etag(b"same"), generate_etag(b"same"));
        assert_ne!(generate_etag(b"content a"), generate_etag(b"content b"));
    }

    #[test]
    fn test_etag_matches() {
        let etag = "\"abc123\"";
        assert!(etag_matches(Some("\"abc123\""), etag));
        assert!(etag_matches(Some("\"xyz\", \"abc123\""), etag));
        assert!(etag_matches(Some("W/\"abc123\""), etag));
        assert!(etag_matches(Some("*"), etag));
        assert!(!etag_matches(Some("\"different\""), etag));
        assert!(!etag_matches(None, etag));
    }
}

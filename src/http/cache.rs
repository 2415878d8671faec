//! HTTP cache validation module
//!
//! `ETag` generation and `If-None-Match` matching for static assets.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Quoted `ETag` over the content plus its length, e.g. `"1c-abc123def"`
pub fn generate_etag(content: &[u8]) -> String {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    format!("\"{:x}-{:x}\"", content.len(), hasher.finish())
}

/// Whether the client's `If-None-Match` header covers `etag` (304 if so)
///
/// Accepts a comma-separated list, weak validators (`W/"..."`) and `*`.
pub fn check_etag_match(if_none_match: Option<&str>, etag: &str) -> bool {
    if_none_match.is_some_and(|header| {
        header.split(',').map(str::trim).any(|candidate| {
            candidate == "*" || candidate.strip_prefix("W/").unwrap_or(candidate) == etag
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_etag() {
        let etag = generate_etag(b"hello world");
        assert!(etag.starts_with("\"b-"));
        assert!(etag.ends_with('"'));
        assert_eq!(etag, generate_etag(b"hello world"));
        assert_ne!(etag, generate_etag(b"hello there"));
    }

    #[test]
    fn test_check_etag_match() {
        let etag = "\"5-abc123\"";
        assert!(check_etag_match(Some("\"5-abc123\""), etag));
        assert!(check_etag_match(Some("\"xyz\", \"5-abc123\""), etag));
        assert!(check_etag_match(Some("W/\"5-abc123\""), etag));
        assert!(check_etag_match(Some("*"), etag));
        assert!(!check_etag_match(Some("\"different\""), etag));
        assert!(!check_etag_match(None, etag));
    }
}

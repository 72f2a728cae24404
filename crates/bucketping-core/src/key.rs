//! Storage Key Layout
//!
//! Every descriptor object lives at `<cluster>/<member>.list` inside the shared
//! namespace. Both segments pass through [`sanitize`] so that a cluster or
//! member identifier can never introduce an extra path level or collide with
//! the `/` delimiter used for prefix listing.
//!
//! Sanitization is lossy: `a/b` and `a-b` map to the same segment. Keys are
//! only ever compared against other sanitized values, never decoded.

use crate::descriptor::MemberAddress;

/// Suffix carried by every descriptor object
pub const SUFFIX: &str = ".list";

/// Character substituted for reserved delimiters
const PLACEHOLDER: char = '-';

/// Replace `/` and `\` with a placeholder.
pub fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' => PLACEHOLDER,
            other => other,
        })
        .collect()
}

/// Member segment for a given address (before sanitization)
pub fn member_key(address: &MemberAddress) -> String {
    address.to_long_string()
}

/// Listing prefix covering all descriptors of a cluster
pub fn cluster_prefix(cluster: &str) -> String {
    format!("{}/", sanitize(cluster))
}

/// Full object key of one member's descriptor within a cluster
pub fn storage_key(cluster: &str, address: &MemberAddress) -> String {
    format!(
        "{}{}{}",
        cluster_prefix(cluster),
        sanitize(&member_key(address)),
        SUFFIX
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_delimiters() {
        assert_eq!(sanitize("a/b\\c"), "a-b-c");
        assert_eq!(sanitize("../../etc"), "..-..-etc");
        assert_eq!(sanitize("plain"), "plain");
    }

    #[test]
    fn test_sanitize_empty() {
        assert_eq!(sanitize(""), "");
    }

    #[test]
    fn test_sanitize_is_idempotent_and_delimiter_free() {
        let inputs = [
            "",
            "grid",
            "/",
            "\\\\",
            "a/b/c",
            "mixed\\/slashes/",
            "unicode/日本\\語",
            "-already-clean-",
        ];
        for input in inputs {
            let once = sanitize(input);
            assert!(!once.contains('/'), "{input:?} -> {once:?}");
            assert!(!once.contains('\\'), "{input:?} -> {once:?}");
            assert_eq!(sanitize(&once), once);
            assert_eq!(sanitize(input), once);
        }
    }

    #[test]
    fn test_sanitize_collision_is_possible() {
        assert_eq!(sanitize("a/b"), sanitize("a-b"));
    }

    #[test]
    fn test_storage_key_layout() {
        let addr: MemberAddress = "6f1c2a3e-0b5d-4c7e-9a8b-1d2e3f4a5b6c".parse().unwrap();
        assert_eq!(
            storage_key("grid", &addr),
            "grid/6f1c2a3e-0b5d-4c7e-9a8b-1d2e3f4a5b6c.list"
        );
        assert_eq!(
            storage_key("team/grid", &addr),
            "team-grid/6f1c2a3e-0b5d-4c7e-9a8b-1d2e3f4a5b6c.list"
        );
    }

    #[test]
    fn test_storage_key_stays_under_cluster_prefix() {
        let addr = MemberAddress::random();
        let key = storage_key("x\\y/z", &addr);
        assert!(key.starts_with(&cluster_prefix("x\\y/z")));
        assert_eq!(key.matches('/').count(), 1);
        assert!(key.ends_with(SUFFIX));
    }
}

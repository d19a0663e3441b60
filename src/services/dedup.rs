//! Duplicate-detection keys: URL normalization and content hashing.
//!
//! Two independent keys identify a submission: the normalized URL and a
//! SHA-256 digest of the raw content. A match on either marks it as a
//! duplicate, which makes ingestion idempotent.

use sha2::{Digest, Sha256};
use url::Url;

/// Query parameters stripped during URL normalization.
const TRACKING_PARAMS: &[&str] = &[
    "utm_source",
    "utm_medium",
    "utm_campaign",
    "utm_content",
    "fbclid",
    "igshid",
    "ref",
    "s",
    "t",
    "si",
    "feature",
];

/// Domains folded into a canonical alias.
const DOMAIN_ALIASES: &[(&str, &str)] = &[("twitter.com", "x.com")];

/// The pair of dedup keys for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupKeys {
    pub normalized_url: Option<String>,
    pub content_hash: String,
}

impl DedupKeys {
    pub fn for_content(url: Option<&str>, content: &str) -> Self {
        Self {
            normalized_url: url.map(normalize_url),
            content_hash: content_hash(content),
        }
    }
}

/// SHA-256 hex digest of the content.
pub fn content_hash(content: &str) -> String {
    let digest = Sha256::digest(content.as_bytes());
    hex::encode(digest)
}

/// Canonicalize a URL for use as a dedup key.
///
/// Tracking parameters are stripped, known domain aliases folded, a leading
/// `www.` removed, the trailing path slash and any fragment dropped, and
/// the result lower-cased. Non-parseable input falls back to the
/// lower-cased raw string.
pub fn normalize_url(raw: &str) -> String {
    let Ok(url) = Url::parse(raw) else {
        return raw.to_lowercase();
    };
    let Some(host) = url.host_str() else {
        return raw.to_lowercase();
    };

    let mut host = host.to_lowercase();
    if let Some(stripped) = host.strip_prefix("www.") {
        host = stripped.to_string();
    }
    for (alias, canonical) in DOMAIN_ALIASES {
        if host == *alias {
            host = (*canonical).to_string();
        }
    }

    let kept: Vec<String> = url
        .query_pairs()
        .filter(|(key, _)| !TRACKING_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| {
            if value.is_empty() {
                key.into_owned()
            } else {
                format!("{}={}", key, value)
            }
        })
        .collect();

    let path = url.path().trim_end_matches('/');

    let mut normalized = format!("{}://{}", url.scheme(), host);
    if let Some(port) = url.port() {
        normalized.push_str(&format!(":{}", port));
    }
    normalized.push_str(path);
    if !kept.is_empty() {
        normalized.push('?');
        normalized.push_str(&kept.join("&"));
    }

    normalized.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_hash_shape() {
        let hash = content_hash("hello world");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash("hello world"));
        assert_ne!(hash, content_hash("hello world!"));
    }

    #[test]
    fn test_tracking_params_stripped() {
        assert_eq!(
            normalize_url("https://x.com/a/b/?utm_source=x"),
            "https://x.com/a/b"
        );
        assert_eq!(
            normalize_url("https://example.com/page?fbclid=abc&id=42"),
            "https://example.com/page?id=42"
        );
    }

    #[test]
    fn test_twitter_aliases_to_x() {
        assert_eq!(
            normalize_url("https://www.twitter.com/a/b"),
            "https://x.com/a/b"
        );
        assert_eq!(
            normalize_url("https://x.com/a/b/?utm_source=x"),
            normalize_url("https://www.twitter.com/a/b")
        );
    }

    #[test]
    fn test_www_trailing_slash_and_fragment() {
        assert_eq!(
            normalize_url("https://www.example.com/docs/#section-2"),
            "https://example.com/docs"
        );
    }

    #[test]
    fn test_case_folding() {
        assert_eq!(
            normalize_url("HTTPS://Example.COM/Path"),
            "https://example.com/path"
        );
    }

    #[test]
    fn test_port_preserved() {
        assert_eq!(
            normalize_url("http://localhost:8080/page/"),
            "http://localhost:8080/page"
        );
    }

    #[test]
    fn test_unparseable_falls_back_to_lowercase() {
        assert_eq!(normalize_url("Not A Url"), "not a url");
    }

    #[test]
    fn test_dedup_keys() {
        let keys = DedupKeys::for_content(Some("https://www.twitter.com/a/b"), "body");
        assert_eq!(keys.normalized_url.as_deref(), Some("https://x.com/a/b"));
        assert_eq!(keys.content_hash, content_hash("body"));

        let keys = DedupKeys::for_content(None, "body");
        assert!(keys.normalized_url.is_none());
    }
}

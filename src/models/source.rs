//! Source model: one deduplicated ingested unit and its metadata.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of content a source was ingested from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Web article or other HTML page
    Article,
    /// Video (transcript-based sources)
    Video,
    /// Tweet / X post
    Tweet,
    /// PDF document
    Pdf,
    /// Plain text without richer provenance
    #[default]
    Text,
}

impl SourceType {
    /// Best-effort classification from a URL; anything served over HTTP
    /// without a more specific match is an article.
    pub fn infer_from_url(url: &str) -> Self {
        let lower = url.to_lowercase();
        let path = lower.split(['?', '#']).next().unwrap_or(&lower);
        if lower.contains("twitter.com/") || lower.contains("x.com/") {
            SourceType::Tweet
        } else if lower.contains("youtube.com/")
            || lower.contains("youtu.be/")
            || lower.contains("vimeo.com/")
        {
            SourceType::Video
        } else if path.ends_with(".pdf") {
            SourceType::Pdf
        } else if lower.starts_with("http://") || lower.starts_with("https://") {
            SourceType::Article
        } else {
            SourceType::Text
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceType::Article => write!(f, "article"),
            SourceType::Video => write!(f, "video"),
            SourceType::Tweet => write!(f, "tweet"),
            SourceType::Pdf => write!(f, "pdf"),
            SourceType::Text => write!(f, "text"),
        }
    }
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "article" => Ok(SourceType::Article),
            "video" => Ok(SourceType::Video),
            "tweet" => Ok(SourceType::Tweet),
            "pdf" => Ok(SourceType::Pdf),
            "text" => Ok(SourceType::Text),
            other => Err(format!("unknown source type: {}", other)),
        }
    }
}

/// A stored source row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub id: i64,
    pub url: Option<String>,
    pub normalized_url: Option<String>,
    pub title: String,
    pub source_type: SourceType,
    pub summary: Option<String>,
    pub content: String,
    pub content_hash: String,
    pub tags: Vec<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub created_at: String,
    pub updated_at: String,
}

/// A source about to be inserted; the store assigns id and timestamps.
#[derive(Debug, Clone)]
pub struct NewSource {
    pub url: Option<String>,
    pub normalized_url: Option<String>,
    pub title: String,
    pub source_type: SourceType,
    pub summary: Option<String>,
    pub content: String,
    pub content_hash: String,
    pub tags: Vec<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Filter for listing sources.
#[derive(Debug, Clone, Default)]
pub struct SourceFilter {
    pub source_type: Option<SourceType>,
    pub tag: Option<String>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_display() {
        assert_eq!(SourceType::Article.to_string(), "article");
        assert_eq!(SourceType::Video.to_string(), "video");
        assert_eq!(SourceType::Tweet.to_string(), "tweet");
        assert_eq!(SourceType::Pdf.to_string(), "pdf");
        assert_eq!(SourceType::Text.to_string(), "text");
    }

    #[test]
    fn test_source_type_parse() {
        assert_eq!("article".parse::<SourceType>().unwrap(), SourceType::Article);
        assert_eq!("TWEET".parse::<SourceType>().unwrap(), SourceType::Tweet);
        assert!("notion".parse::<SourceType>().is_err());
    }

    #[test]
    fn test_source_type_serde() {
        let json = serde_json::to_string(&SourceType::Pdf).unwrap();
        assert_eq!(json, "\"pdf\"");
        let parsed: SourceType = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, SourceType::Pdf);
    }

    #[test]
    fn test_infer_from_url() {
        assert_eq!(
            SourceType::infer_from_url("https://x.com/user/status/1"),
            SourceType::Tweet
        );
        assert_eq!(
            SourceType::infer_from_url("https://twitter.com/user/status/1"),
            SourceType::Tweet
        );
        assert_eq!(
            SourceType::infer_from_url("https://youtu.be/abc123"),
            SourceType::Video
        );
        assert_eq!(
            SourceType::infer_from_url("https://example.com/paper.pdf?dl=1"),
            SourceType::Pdf
        );
        assert_eq!(
            SourceType::infer_from_url("https://example.com/blog/post"),
            SourceType::Article
        );
        assert_eq!(SourceType::infer_from_url("notes.txt"), SourceType::Text);
    }
}

//! Search-related models for queries and results.

use serde::{Deserialize, Serialize};

use super::source::SourceType;

/// Output format for CLI results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Options applied when ranking chunks against a query.
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Maximum results to return.
    pub limit: usize,
    /// Keep only the highest-ranked chunk per source.
    pub dedupe_by_source: bool,
    /// Result content is truncated to this many characters.
    pub max_display_len: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            limit: 10,
            dedupe_by_source: true,
            max_display_len: 2500,
        }
    }
}

impl SearchOptions {
    /// Set the result limit.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Enable or disable per-source deduplication.
    #[must_use]
    pub fn with_dedupe_by_source(mut self, dedupe: bool) -> Self {
        self.dedupe_by_source = dedupe;
        self
    }

    /// Set the display truncation length.
    #[must_use]
    pub fn with_max_display_len(mut self, max_display_len: usize) -> Self {
        self.max_display_len = max_display_len;
        self
    }
}

/// One ranked excerpt returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub source_id: i64,
    pub title: String,
    pub url: Option<String>,
    pub source_type: SourceType,
    pub content: String,
    pub similarity: f32,
    pub chunk_index: i64,
}

/// Grounding envelope for a question. Answer generation happens outside
/// this crate; `answer` is filled by a downstream consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundedAnswer {
    pub answer: Option<String>,
    pub results: Vec<RetrievedChunk>,
    pub prompt: Option<String>,
}

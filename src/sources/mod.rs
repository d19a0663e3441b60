//! Content extraction.
//!
//! Source-specific extraction (HTML articles, PDFs, video transcripts,
//! tweets) lives behind the [`Extractor`] trait so richer collaborators can
//! be plugged in; the crate ships a plain-text and local-file extractor.

mod text;

pub use text::TextExtractor;

use async_trait::async_trait;
use std::path::PathBuf;

use crate::error::ExtractError;
use crate::models::SourceType;

/// One submission to the ingestion pipeline.
#[derive(Debug, Clone)]
pub enum IngestInput {
    /// A local file read as UTF-8 text.
    File {
        path: PathBuf,
        url: Option<String>,
        title: Option<String>,
    },
    /// Literal text (argument or stdin).
    Text {
        content: String,
        url: Option<String>,
        title: Option<String>,
    },
}

/// Extraction result handed to the pipeline.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub url: Option<String>,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub source_type: SourceType,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Trait for content extractors.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Turn a submission into extracted content. Failures propagate
    /// unmodified to the caller.
    async fn extract(
        &self,
        input: &IngestInput,
        hint: Option<SourceType>,
    ) -> Result<Extracted, ExtractError>;
}

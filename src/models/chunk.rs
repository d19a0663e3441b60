//! Chunk models: bounded content slices with their embeddings.

use super::source::SourceType;

/// A chunk about to be inserted under a source.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub provider: String,
    pub model: String,
}

/// A chunk joined with the fields of its owning source that ranking and
/// projection need.
#[derive(Debug, Clone)]
pub struct StoredChunk {
    pub id: i64,
    pub source_id: i64,
    pub chunk_index: i64,
    pub content: String,
    pub embedding: Vec<f32>,
    pub title: String,
    pub url: Option<String>,
    pub source_type: SourceType,
}

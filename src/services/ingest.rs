//! Ingestion pipeline: lock, extract, dedup, chunk, embed, persist.

use std::sync::Arc;

use serde::Serialize;

use crate::error::{ExtractError, IngestError};
use crate::models::{NewChunk, NewSource, SourceType};
use crate::services::chunker::Chunker;
use crate::services::dedup::DedupKeys;
use crate::services::embedding::EmbeddingService;
use crate::services::lock::IngestLock;
use crate::sources::{Extractor, IngestInput};
use crate::storage::KnowledgeStore;

/// Terminal states of one ingest call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IngestOutcome {
    /// A new source and its chunks were persisted.
    #[serde(rename = "success")]
    Ingested {
        source_id: i64,
        title: String,
        source_type: SourceType,
        chunk_count: usize,
    },
    /// The submission matched an existing source; nothing was written.
    Duplicate { source_id: i64 },
}

/// Orchestrates one submission through the full pipeline.
pub struct Ingestor {
    store: Arc<dyn KnowledgeStore>,
    embeddings: Arc<EmbeddingService>,
    chunker: Chunker,
    extractor: Arc<dyn Extractor>,
}

impl Ingestor {
    pub fn new(
        store: Arc<dyn KnowledgeStore>,
        embeddings: Arc<EmbeddingService>,
        chunker: Chunker,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            store,
            embeddings,
            chunker,
            extractor,
        }
    }

    /// Run the pipeline for one submission.
    ///
    /// The advisory lock is held for the whole call and released on every
    /// exit path, including the duplicate short-circuit and failures.
    pub async fn ingest(
        &self,
        input: IngestInput,
        hint: Option<SourceType>,
        tags: Vec<String>,
    ) -> Result<IngestOutcome, IngestError> {
        let _lock = match self.store.lock_path() {
            Some(path) => IngestLock::acquire(&path)?,
            None => IngestLock::noop(),
        };

        let extracted = self.extractor.extract(&input, hint).await?;

        let keys = DedupKeys::for_content(extracted.url.as_deref(), &extracted.content);
        if let Some(existing) = self
            .store
            .find_duplicate(keys.normalized_url.as_deref(), &keys.content_hash)
            .await?
        {
            return Ok(IngestOutcome::Duplicate {
                source_id: existing,
            });
        }

        let fragments = self.chunker.chunk(&extracted.content);
        if fragments.is_empty() {
            return Err(
                ExtractError::EmptyContent("no chunkable content".to_string()).into(),
            );
        }

        // Every embedding is computed before anything is written; one
        // failure aborts the whole ingest.
        let texts: Vec<String> = fragments.iter().map(|f| f.content.clone()).collect();
        let embeddings = self.embeddings.embed_batch(&texts).await?;

        let chunks: Vec<NewChunk> = fragments
            .into_iter()
            .zip(embeddings)
            .map(|(fragment, embedding)| NewChunk {
                chunk_index: fragment.index as i64,
                content: fragment.content,
                embedding: embedding.vector,
                provider: embedding.provider,
                model: embedding.model,
            })
            .collect();
        let chunk_count = chunks.len();

        let source = NewSource {
            url: extracted.url,
            normalized_url: keys.normalized_url,
            title: extracted.title.clone(),
            source_type: extracted.source_type,
            summary: extracted.excerpt,
            content: extracted.content,
            content_hash: keys.content_hash,
            tags,
            metadata: extracted.metadata,
        };

        let source_id = self.store.insert_source_with_chunks(source, chunks).await?;

        Ok(IngestOutcome::Ingested {
            source_id,
            title: extracted.title,
            source_type: extracted.source_type,
            chunk_count,
        })
    }
}

//! Similarity ranking over stored chunks.
//!
//! Backends with native server-side ranking are deferred to; everything
//! else goes through the in-process cosine path. Both paths produce the
//! same projection so callers never branch on the backend.

use std::collections::HashSet;

use crate::error::SearchError;
use crate::models::{RetrievedChunk, SearchOptions, StoredChunk};
use crate::storage::KnowledgeStore;
use crate::utils::truncate_chars;

/// Candidate multiplier for native ranking: per-source dedup may discard
/// neighbors, so more than `limit` rows are fetched up front.
const NATIVE_CANDIDATE_FACTOR: usize = 5;

/// Cosine similarity in [-1, 1].
///
/// Returns 0.0 on dimension mismatch or when either vector has zero norm,
/// which guards both divide-by-zero and cross-provider dimension clashes.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Score and order a chunk pool against a query vector.
pub fn rank(
    query: &[f32],
    pool: Vec<StoredChunk>,
    options: &SearchOptions,
) -> Vec<RetrievedChunk> {
    let mut scored: Vec<(StoredChunk, f32)> = pool
        .into_iter()
        .filter(|chunk| !chunk.embedding.is_empty())
        .map(|chunk| {
            let similarity = cosine_similarity(query, &chunk.embedding);
            (chunk, similarity)
        })
        .collect();

    // Stable sort: equal scores keep their original order.
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    project(scored, options)
}

/// Post-filter and project an already ranked list: optional per-source
/// dedup, top-K cut, display truncation.
pub fn project(
    ranked: Vec<(StoredChunk, f32)>,
    options: &SearchOptions,
) -> Vec<RetrievedChunk> {
    let mut seen_sources = HashSet::new();
    let mut results = Vec::new();

    for (chunk, similarity) in ranked {
        if options.dedupe_by_source && !seen_sources.insert(chunk.source_id) {
            continue;
        }
        results.push(RetrievedChunk {
            source_id: chunk.source_id,
            title: chunk.title,
            url: chunk.url,
            source_type: chunk.source_type,
            content: truncate_chars(&chunk.content, options.max_display_len),
            similarity,
            chunk_index: chunk.chunk_index,
        });
        if results.len() >= options.limit {
            break;
        }
    }

    results
}

/// Ranked retrieval against a store, using native ranking when offered.
pub async fn search(
    store: &dyn KnowledgeStore,
    query: &[f32],
    options: &SearchOptions,
) -> Result<Vec<RetrievedChunk>, SearchError> {
    if store.supports_vector_search() {
        let fetch = if options.dedupe_by_source {
            options.limit * NATIVE_CANDIDATE_FACTOR
        } else {
            options.limit
        };
        let ranked = store.vector_search(query, fetch).await?;
        Ok(project(ranked, options))
    } else {
        let pool = store.all_chunks_with_embeddings().await?;
        Ok(rank(query, pool, options))
    }
}

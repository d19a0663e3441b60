//! Query-side coordination: embed the query, rank, assemble grounding.

use std::sync::Arc;

use crate::error::SearchError;
use crate::models::{GroundedAnswer, RetrievedChunk, SearchOptions};
use crate::services::embedding::EmbeddingService;
use crate::services::similarity;
use crate::storage::KnowledgeStore;

/// Separator between context sections in the grounding prompt.
pub const CONTEXT_SEPARATOR: &str = "\n\n---\n\n";

/// Read-only retrieval over the store. Runs unlocked and may overlap with
/// an in-flight ingest.
pub struct Retriever {
    store: Arc<dyn KnowledgeStore>,
    embeddings: Arc<EmbeddingService>,
}

impl Retriever {
    pub fn new(store: Arc<dyn KnowledgeStore>, embeddings: Arc<EmbeddingService>) -> Self {
        Self { store, embeddings }
    }

    /// Ranked excerpts for a query.
    pub async fn search(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> Result<Vec<RetrievedChunk>, SearchError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(SearchError::InvalidQuery(
                "query cannot be empty".to_string(),
            ));
        }

        let embedded = self.embeddings.embed(trimmed).await?;
        similarity::search(self.store.as_ref(), &embedded.vector, options).await
    }

    /// Grounding envelope for a question. Generation happens downstream;
    /// this only prepares context and the instruction prompt.
    pub async fn ask(
        &self,
        question: &str,
        options: &SearchOptions,
    ) -> Result<GroundedAnswer, SearchError> {
        let results = self.search(question, options).await?;
        if results.is_empty() {
            return Ok(GroundedAnswer {
                answer: None,
                results: Vec::new(),
                prompt: None,
            });
        }

        let prompt = build_prompt(question, &results);
        Ok(GroundedAnswer {
            answer: None,
            results,
            prompt: Some(prompt),
        })
    }
}

fn build_context(results: &[RetrievedChunk]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let url = result.url.as_deref().unwrap_or("no url");
            format!(
                "[Source {}: {} ({})]\n{}",
                i + 1,
                result.title,
                url,
                result.content
            )
        })
        .collect::<Vec<_>>()
        .join(CONTEXT_SEPARATOR)
}

fn build_prompt(question: &str, results: &[RetrievedChunk]) -> String {
    format!(
        "Answer the question using only the context below. Cite the sources you \
         rely on by their [Source N] labels. If the context does not contain the \
         answer, say so.\n\nContext:\n{}\n\nQuestion: {}\n\nAnswer:",
        build_context(results),
        question
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbeddingError;
    use crate::models::{NewChunk, NewSource, SourceType};
    use crate::services::providers::EmbeddingBackend;
    use crate::storage::SqliteStore;
    use crate::utils::retry::RetryPolicy;
    use async_trait::async_trait;
    use std::time::Duration;

    struct AxisBackend;

    #[async_trait]
    impl EmbeddingBackend for AxisBackend {
        fn name(&self) -> &'static str {
            "stub"
        }

        fn model(&self) -> &str {
            "stub-model"
        }

        fn dimension(&self) -> usize {
            2
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            // Maps "x"-queries onto one axis, everything else onto the other
            if text.contains('x') {
                Ok(vec![1.0, 0.0])
            } else {
                Ok(vec![0.0, 1.0])
            }
        }
    }

    fn embeddings() -> Arc<EmbeddingService> {
        Arc::new(EmbeddingService::new(
            Arc::new(AxisBackend),
            Arc::new(AxisBackend),
            false,
            RetryPolicy::new(1).with_delays(vec![Duration::from_millis(1)]),
        ))
    }

    fn source(title: &str, hash: &str) -> NewSource {
        NewSource {
            url: None,
            normalized_url: None,
            title: title.to_string(),
            source_type: SourceType::Text,
            summary: None,
            content: "content".to_string(),
            content_hash: hash.to_string(),
            tags: Vec::new(),
            metadata: serde_json::Map::new(),
        }
    }

    fn chunk(index: i64, content: &str, embedding: Vec<f32>) -> NewChunk {
        NewChunk {
            chunk_index: index,
            content: content.to_string(),
            embedding,
            provider: "stub".to_string(),
            model: "stub-model".to_string(),
        }
    }

    async fn seeded_store() -> Arc<dyn KnowledgeStore> {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init().await.unwrap();
        store
            .insert_source_with_chunks(
                source("X notes", "hash-x"),
                vec![chunk(0, "about x things", vec![1.0, 0.0])],
            )
            .await
            .unwrap();
        store
            .insert_source_with_chunks(
                source("Y notes", "hash-y"),
                vec![chunk(0, "about y things", vec![0.0, 1.0])],
            )
            .await
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let retriever = Retriever::new(seeded_store().await, embeddings());
        let results = retriever
            .search("x", &SearchOptions::default())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].title, "X notes");
        assert!(results[0].similarity > results[1].similarity);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let retriever = Retriever::new(seeded_store().await, embeddings());
        let result = retriever.search("   ", &SearchOptions::default()).await;
        assert!(matches!(result, Err(SearchError::InvalidQuery(_))));
    }

    #[tokio::test]
    async fn test_ask_builds_labelled_prompt() {
        let retriever = Retriever::new(seeded_store().await, embeddings());
        let answer = retriever
            .ask("x", &SearchOptions::default())
            .await
            .unwrap();

        assert!(answer.answer.is_none());
        assert_eq!(answer.results.len(), 2);
        let prompt = answer.prompt.unwrap();
        assert!(prompt.contains("[Source 1: X notes (no url)]"));
        assert!(prompt.contains("[Source 2: Y notes (no url)]"));
        assert!(prompt.contains(CONTEXT_SEPARATOR));
        assert!(prompt.contains("Question: x"));
    }

    #[tokio::test]
    async fn test_ask_with_no_results_returns_null_envelope() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.init().await.unwrap();
        let retriever = Retriever::new(Arc::new(store), embeddings());

        let answer = retriever
            .ask("anything", &SearchOptions::default())
            .await
            .unwrap();
        assert!(answer.answer.is_none());
        assert!(answer.results.is_empty());
        assert!(answer.prompt.is_none());
    }
}

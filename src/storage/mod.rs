//! Persistence backends behind one contract.
//!
//! Two interchangeable backends implement [`KnowledgeStore`] and are
//! selected at construction from configuration: a file-based SQLite store
//! and PostgreSQL with pgvector. Callers branch only on whether a backend
//! offers native ranking.

mod postgres;
mod sqlite;

pub use postgres::PostgresStore;
pub use sqlite::SqliteStore;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::StoreError;
use crate::models::{
    NewChunk, NewSource, SourceFilter, SourceRecord, StorageConfig, StorageDriver, StoredChunk,
};

/// Aggregate counts for the status surface.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    pub total_sources: u64,
    pub total_chunks: u64,
    pub by_type: BTreeMap<String, u64>,
}

/// Contract shared by all persistence backends.
#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    /// Create schema and extensions if missing.
    async fn init(&self) -> Result<(), StoreError>;

    /// Duplicate check: normalized URL first, then content hash.
    async fn find_duplicate(
        &self,
        normalized_url: Option<&str>,
        content_hash: &str,
    ) -> Result<Option<i64>, StoreError>;

    /// Insert one source and its chunk batch in a single transaction.
    async fn insert_source_with_chunks(
        &self,
        source: NewSource,
        chunks: Vec<NewChunk>,
    ) -> Result<i64, StoreError>;

    async fn get_source(&self, id: i64) -> Result<Option<SourceRecord>, StoreError>;

    async fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<SourceRecord>, StoreError>;

    /// Delete a source and, by cascade, its chunks. Returns affected
    /// source rows.
    async fn delete_source(&self, id: i64) -> Result<u64, StoreError>;

    /// Full chunk pool for in-process ranking, joined with source fields.
    async fn all_chunks_with_embeddings(&self) -> Result<Vec<StoredChunk>, StoreError>;

    /// Whether the backend ranks vectors server-side.
    fn supports_vector_search(&self) -> bool {
        false
    }

    /// Native ranked retrieval; backends without it return
    /// [`StoreError::Unsupported`].
    async fn vector_search(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, StoreError>;

    async fn stats(&self) -> Result<StoreStats, StoreError>;

    /// Marker path for the advisory ingest lock; `None` when the backend
    /// arbitrates concurrent writers itself.
    fn lock_path(&self) -> Option<PathBuf>;
}

/// Select and open a backend from configuration.
///
/// `embedding_dimension` sizes the vector column for backends that need a
/// declared dimension up front.
pub async fn open_store(
    config: &StorageConfig,
    embedding_dimension: usize,
) -> Result<Arc<dyn KnowledgeStore>, StoreError> {
    let store: Arc<dyn KnowledgeStore> = match config.driver {
        StorageDriver::Sqlite => Arc::new(SqliteStore::open(&config.path)?),
        StorageDriver::Postgres => {
            Arc::new(PostgresStore::connect(&config.url, embedding_dimension).await?)
        }
    };
    store.init().await?;
    Ok(store)
}

//! PostgreSQL backend with pgvector server-side ranking.
//!
//! Postgres arbitrates concurrent writers itself, so the advisory ingest
//! lock is a no-op for this backend (`lock_path` returns `None`).

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pgvector::Vector;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use super::{KnowledgeStore, StoreStats};
use crate::error::StoreError;
use crate::models::{NewChunk, NewSource, SourceFilter, SourceRecord, StoredChunk};

pub struct PostgresStore {
    pool: PgPool,
    dimension: usize,
}

impl PostgresStore {
    pub async fn connect(url: &str, dimension: usize) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { pool, dimension })
    }
}

fn row_to_source(row: &sqlx::postgres::PgRow) -> Result<SourceRecord, StoreError> {
    let source_type: String = row.try_get("source_type")?;
    let tags: String = row.try_get("tags")?;
    let metadata: String = row.try_get("metadata")?;
    let created_at: DateTime<Utc> = row.try_get("created_at")?;
    let updated_at: DateTime<Utc> = row.try_get("updated_at")?;
    Ok(SourceRecord {
        id: row.try_get("id")?,
        url: row.try_get("url")?,
        normalized_url: row.try_get("normalized_url")?,
        title: row.try_get("title")?,
        source_type: source_type.parse().unwrap_or_default(),
        summary: row.try_get("summary")?,
        content: row.try_get("content")?,
        content_hash: row.try_get("content_hash")?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
        created_at: created_at.to_rfc3339(),
        updated_at: updated_at.to_rfc3339(),
    })
}

fn row_to_stored_chunk(row: &sqlx::postgres::PgRow) -> Result<StoredChunk, StoreError> {
    let embedding: Vector = row.try_get("embedding")?;
    let source_type: String = row.try_get("source_type")?;
    Ok(StoredChunk {
        id: row.try_get("id")?,
        source_id: row.try_get("source_id")?,
        chunk_index: row.try_get("chunk_index")?,
        content: row.try_get("content")?,
        embedding: embedding.to_vec(),
        title: row.try_get("title")?,
        url: row.try_get("url")?,
        source_type: source_type.parse().unwrap_or_default(),
    })
}

#[async_trait]
impl KnowledgeStore for PostgresStore {
    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS sources (
                 id BIGSERIAL PRIMARY KEY,
                 url TEXT,
                 normalized_url TEXT UNIQUE,
                 title TEXT NOT NULL,
                 source_type TEXT NOT NULL,
                 summary TEXT,
                 content TEXT NOT NULL,
                 content_hash TEXT NOT NULL UNIQUE,
                 tags TEXT NOT NULL DEFAULT '[]',
                 metadata TEXT NOT NULL DEFAULT '{}',
                 created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                 updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
             )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS chunks (
                 id BIGSERIAL PRIMARY KEY,
                 source_id BIGINT NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
                 chunk_index BIGINT NOT NULL,
                 content TEXT NOT NULL,
                 embedding vector({}) NOT NULL,
                 provider TEXT NOT NULL,
                 model TEXT NOT NULL,
                 created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                 UNIQUE (source_id, chunk_index)
             )",
            self.dimension
        ))
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn find_duplicate(
        &self,
        normalized_url: Option<&str>,
        content_hash: &str,
    ) -> Result<Option<i64>, StoreError> {
        if let Some(url) = normalized_url {
            let by_url = sqlx::query("SELECT id FROM sources WHERE normalized_url = $1")
                .bind(url)
                .fetch_optional(&self.pool)
                .await?;
            if let Some(row) = by_url {
                return Ok(Some(row.try_get("id")?));
            }
        }
        let by_hash = sqlx::query("SELECT id FROM sources WHERE content_hash = $1")
            .bind(content_hash)
            .fetch_optional(&self.pool)
            .await?;
        match by_hash {
            Some(row) => Ok(Some(row.try_get("id")?)),
            None => Ok(None),
        }
    }

    async fn insert_source_with_chunks(
        &self,
        source: NewSource,
        chunks: Vec<NewChunk>,
    ) -> Result<i64, StoreError> {
        let tags = serde_json::to_string(&source.tags)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;
        let metadata = serde_json::to_string(&source.metadata)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            "INSERT INTO sources (url, normalized_url, title, source_type, summary, \
             content, content_hash, tags, metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING id",
        )
        .bind(&source.url)
        .bind(&source.normalized_url)
        .bind(&source.title)
        .bind(source.source_type.to_string())
        .bind(&source.summary)
        .bind(&source.content)
        .bind(&source.content_hash)
        .bind(&tags)
        .bind(&metadata)
        .fetch_one(&mut *tx)
        .await?;
        let source_id: i64 = row.try_get("id")?;

        for chunk in &chunks {
            sqlx::query(
                "INSERT INTO chunks (source_id, chunk_index, content, embedding, \
                 provider, model) VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(source_id)
            .bind(chunk.chunk_index)
            .bind(&chunk.content)
            .bind(Vector::from(chunk.embedding.clone()))
            .bind(&chunk.provider)
            .bind(&chunk.model)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(source_id)
    }

    async fn get_source(&self, id: i64) -> Result<Option<SourceRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM sources WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => Ok(Some(row_to_source(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<SourceRecord>, StoreError> {
        let mut sql = "SELECT * FROM sources".to_string();
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(source_type) = filter.source_type {
            args.push(source_type.to_string());
            clauses.push(format!("source_type = ${}", args.len()));
        }
        if let Some(ref tag) = filter.tag {
            args.push(format!("%\"{}\"%", tag));
            clauses.push(format!("tags LIKE ${}", args.len()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut query = sqlx::query(&sql);
        for arg in &args {
            query = query.bind(arg.as_str());
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(row_to_source).collect()
    }

    async fn delete_source(&self, id: i64) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sources WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn all_chunks_with_embeddings(&self) -> Result<Vec<StoredChunk>, StoreError> {
        let rows = sqlx::query(
            "SELECT c.id, c.source_id, c.chunk_index, c.content, c.embedding, \
             s.title, s.url, s.source_type \
             FROM chunks c JOIN sources s ON s.id = c.source_id \
             ORDER BY c.source_id, c.chunk_index",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_stored_chunk).collect()
    }

    fn supports_vector_search(&self) -> bool {
        true
    }

    async fn vector_search(
        &self,
        query: &[f32],
        limit: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, StoreError> {
        let rows = sqlx::query(
            "SELECT c.id, c.source_id, c.chunk_index, c.content, c.embedding, \
             s.title, s.url, s.source_type, \
             1 - (c.embedding <=> $1) AS similarity \
             FROM chunks c JOIN sources s ON s.id = c.source_id \
             ORDER BY c.embedding <=> $1 \
             LIMIT $2",
        )
        .bind(Vector::from(query.to_vec()))
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| {
                let chunk = row_to_stored_chunk(row)?;
                let similarity: f64 = row.try_get("similarity")?;
                Ok((chunk, similarity as f32))
            })
            .collect()
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let sources_row = sqlx::query("SELECT COUNT(*) AS n FROM sources")
            .fetch_one(&self.pool)
            .await?;
        let chunks_row = sqlx::query("SELECT COUNT(*) AS n FROM chunks")
            .fetch_one(&self.pool)
            .await?;
        let total_sources: i64 = sources_row.try_get("n")?;
        let total_chunks: i64 = chunks_row.try_get("n")?;

        let mut by_type = std::collections::BTreeMap::new();
        let rows =
            sqlx::query("SELECT source_type, COUNT(*) AS n FROM sources GROUP BY source_type")
                .fetch_all(&self.pool)
                .await?;
        for row in rows {
            let source_type: String = row.try_get("source_type")?;
            let count: i64 = row.try_get("n")?;
            by_type.insert(source_type, count as u64);
        }

        Ok(StoreStats {
            total_sources: total_sources as u64,
            total_chunks: total_chunks as u64,
            by_type,
        })
    }

    fn lock_path(&self) -> Option<PathBuf> {
        None
    }
}

//! File-based backend on SQLite.
//!
//! Embeddings are stored as contiguous little-endian f32 BLOBs; ranking
//! happens in-process, so `supports_vector_search` stays false.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use rusqlite::{Connection, OptionalExtension, params};

use super::{KnowledgeStore, StoreStats};
use crate::error::StoreError;
use crate::models::{NewChunk, NewSource, SourceFilter, SourceRecord, StoredChunk};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sources (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT,
    normalized_url TEXT UNIQUE,
    title TEXT NOT NULL,
    source_type TEXT NOT NULL,
    summary TEXT,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL UNIQUE,
    tags TEXT NOT NULL DEFAULT '[]',
    metadata TEXT NOT NULL DEFAULT '{}',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS chunks (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    source_id INTEGER NOT NULL REFERENCES sources(id) ON DELETE CASCADE,
    chunk_index INTEGER NOT NULL,
    content TEXT NOT NULL,
    embedding BLOB NOT NULL,
    provider TEXT NOT NULL,
    model TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE (source_id, chunk_index)
);

CREATE INDEX IF NOT EXISTS idx_chunks_source ON chunks(source_id);
"#;

pub struct SqliteStore {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Connection(e.to_string()))?;
        }
        let conn = Connection::open(path)
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        // WAL keeps concurrent readers (search during ingest) cheap
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: Some(path.to_path_buf()),
        })
    }

    /// In-memory store for tests and throwaway sessions.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn: Mutex::new(conn),
            path: None,
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Serialize an embedding as a contiguous little-endian f32 array.
pub(crate) fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for value in vector {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

pub(crate) fn decode_embedding(bytes: &[u8]) -> Result<Vec<f32>, StoreError> {
    if bytes.len() % 4 != 0 {
        return Err(StoreError::Corrupt(format!(
            "embedding blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

fn row_to_source(row: &rusqlite::Row<'_>) -> rusqlite::Result<SourceRecord> {
    let source_type: String = row.get("source_type")?;
    let tags: String = row.get("tags")?;
    let metadata: String = row.get("metadata")?;
    Ok(SourceRecord {
        id: row.get("id")?,
        url: row.get("url")?,
        normalized_url: row.get("normalized_url")?,
        title: row.get("title")?,
        source_type: source_type.parse().unwrap_or_default(),
        summary: row.get("summary")?,
        content: row.get("content")?,
        content_hash: row.get("content_hash")?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

#[async_trait]
impl KnowledgeStore for SqliteStore {
    async fn init(&self) -> Result<(), StoreError> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    async fn find_duplicate(
        &self,
        normalized_url: Option<&str>,
        content_hash: &str,
    ) -> Result<Option<i64>, StoreError> {
        let conn = self.conn();
        if let Some(url) = normalized_url {
            let by_url: Option<i64> = conn
                .query_row(
                    "SELECT id FROM sources WHERE normalized_url = ?1",
                    params![url],
                    |row| row.get(0),
                )
                .optional()?;
            if by_url.is_some() {
                return Ok(by_url);
            }
        }
        let by_hash: Option<i64> = conn
            .query_row(
                "SELECT id FROM sources WHERE content_hash = ?1",
                params![content_hash],
                |row| row.get(0),
            )
            .optional()?;
        Ok(by_hash)
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
        let now = chrono::Utc::now().to_rfc3339();

        let mut conn = self.conn();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO sources (url, normalized_url, title, source_type, summary, \
             content, content_hash, tags, metadata, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                source.url,
                source.normalized_url,
                source.title,
                source.source_type.to_string(),
                source.summary,
                source.content,
                source.content_hash,
                tags,
                metadata,
                now,
                now,
            ],
        )?;
        let source_id = tx.last_insert_rowid();

        {
            let mut stmt = tx.prepare(
                "INSERT INTO chunks (source_id, chunk_index, content, embedding, \
                 provider, model, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for chunk in &chunks {
                stmt.execute(params![
                    source_id,
                    chunk.chunk_index,
                    chunk.content,
                    encode_embedding(&chunk.embedding),
                    chunk.provider,
                    chunk.model,
                    now,
                ])?;
            }
        }

        tx.commit()?;
        Ok(source_id)
    }

    async fn get_source(&self, id: i64) -> Result<Option<SourceRecord>, StoreError> {
        let conn = self.conn();
        let record = conn
            .query_row(
                "SELECT * FROM sources WHERE id = ?1",
                params![id],
                row_to_source,
            )
            .optional()?;
        Ok(record)
    }

    async fn list_sources(&self, filter: &SourceFilter) -> Result<Vec<SourceRecord>, StoreError> {
        let conn = self.conn();
        let mut sql = "SELECT * FROM sources".to_string();
        let mut clauses: Vec<String> = Vec::new();
        let mut args: Vec<String> = Vec::new();

        if let Some(source_type) = filter.source_type {
            args.push(source_type.to_string());
            clauses.push(format!("source_type = ?{}", args.len()));
        }
        if let Some(ref tag) = filter.tag {
            args.push(format!("%\"{}\"%", tag));
            clauses.push(format!("tags LIKE ?{}", args.len()));
        }
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args.iter()), row_to_source)?;
        let mut sources = Vec::new();
        for row in rows {
            sources.push(row?);
        }
        Ok(sources)
    }

    async fn delete_source(&self, id: i64) -> Result<u64, StoreError> {
        let changes = self
            .conn()
            .execute("DELETE FROM sources WHERE id = ?1", params![id])?;
        Ok(changes as u64)
    }

    async fn all_chunks_with_embeddings(&self) -> Result<Vec<StoredChunk>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT c.id, c.source_id, c.chunk_index, c.content, c.embedding, \
             s.title, s.url, s.source_type \
             FROM chunks c JOIN sources s ON s.id = c.source_id \
             ORDER BY c.source_id, c.chunk_index",
        )?;
        let rows = stmt.query_map([], |row| {
            let blob: Vec<u8> = row.get("embedding")?;
            let source_type: String = row.get("source_type")?;
            Ok((
                StoredChunk {
                    id: row.get("id")?,
                    source_id: row.get("source_id")?,
                    chunk_index: row.get("chunk_index")?,
                    content: row.get("content")?,
                    embedding: Vec::new(),
                    title: row.get("title")?,
                    url: row.get("url")?,
                    source_type: source_type.parse().unwrap_or_default(),
                },
                blob,
            ))
        })?;

        let mut chunks = Vec::new();
        for row in rows {
            let (mut chunk, blob) = row?;
            chunk.embedding = decode_embedding(&blob)?;
            chunks.push(chunk);
        }
        Ok(chunks)
    }

    async fn vector_search(
        &self,
        _query: &[f32],
        _limit: usize,
    ) -> Result<Vec<(StoredChunk, f32)>, StoreError> {
        Err(StoreError::Unsupported("vector_search"))
    }

    async fn stats(&self) -> Result<StoreStats, StoreError> {
        let conn = self.conn();
        let total_sources: i64 =
            conn.query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))?;
        let total_chunks: i64 =
            conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get(0))?;

        let mut by_type = std::collections::BTreeMap::new();
        let mut stmt =
            conn.prepare("SELECT source_type, COUNT(*) FROM sources GROUP BY source_type")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows {
            let (source_type, count) = row?;
            by_type.insert(source_type, count as u64);
        }

        Ok(StoreStats {
            total_sources: total_sources as u64,
            total_chunks: total_chunks as u64,
            by_type,
        })
    }

    fn lock_path(&self) -> Option<PathBuf> {
        self.path
            .as_ref()
            .map(|p| PathBuf::from(format!("{}.ingest.lock", p.display())))
    }
}

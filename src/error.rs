//! Error types for the memoria knowledge store.

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors from content extraction.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("unsupported input: {0}")]
    Unsupported(String),

    #[error("empty content: {0}")]
    EmptyContent(String),
}

/// Errors from embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to reach embedding provider: {0}")]
    Connection(String),

    #[error("embedding request timed out")]
    Timeout,

    #[error("provider returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("missing credential for provider {0}")]
    MissingCredential(&'static str),

    #[error("no embedding available: {0}")]
    NoProvider(String),
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            // Connection and timeout errors are retryable
            EmbeddingError::Connection(_) | EmbeddingError::Timeout => true,
            // Rate limits and server-side failures might be transient
            EmbeddingError::Status { status, .. } => {
                *status == 429 || (500..=599).contains(status)
            }
            EmbeddingError::InvalidResponse(_)
            | EmbeddingError::MissingCredential(_)
            | EmbeddingError::NoProvider(_) => false,
        }
    }
}

/// Errors from the persistence backends.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to connect to store: {0}")]
    Connection(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("corrupt record: {0}")]
    Corrupt(String),

    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Query(e.to_string())
    }
}

/// Errors from the advisory ingestion lock.
#[derive(Debug, Error)]
pub enum LockError {
    #[error("ingestion already in progress (lock held since {since})")]
    Contention { since: String },

    #[error("lock file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("lock error: {0}")]
    Lock(#[from] LockError),

    #[error("extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("persistence error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from configuration handling.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    Path(String),

    #[error("validation error: {0}")]
    Validation(String),
}

/// Errors from search operations.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Other(String),
}

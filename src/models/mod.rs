mod chunk;
mod config;
mod search;
mod source;

pub use chunk::{NewChunk, StoredChunk};
pub use config::{
    ChunkingConfig, Config, DEFAULT_GEMINI_MODEL, DEFAULT_OPENAI_MODEL, DEFAULT_POSTGRES_URL,
    EmbeddingConfig, SearchConfig, StorageConfig, StorageDriver,
};
pub use search::{GroundedAnswer, OutputFormat, RetrievedChunk, SearchOptions};
pub use source::{NewSource, SourceFilter, SourceRecord, SourceType};

mod chunker;
mod dedup;
mod embedding;
mod ingest;
mod lock;
mod providers;
mod retrieval;
mod similarity;

pub use chunker::{Chunker, TextFragment};
pub use dedup::{DedupKeys, content_hash, normalize_url};
pub use embedding::{CACHE_CAPACITY, Embedding, EmbeddingService, MAX_INPUT_CHARS};
pub use ingest::{IngestOutcome, Ingestor};
pub use lock::{IngestLock, STALE_AFTER_SECS};
pub use providers::{EmbeddingBackend, GeminiBackend, OpenAiBackend};
pub use retrieval::{CONTEXT_SEPARATOR, Retriever};
pub use similarity::cosine_similarity;

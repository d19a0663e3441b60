//! CLI command implementations.

mod add;
mod ask;
mod config;
mod search;
mod source;
mod status;

pub use add::{AddArgs, handle_add};
pub use ask::{AskArgs, handle_ask};
pub use config::{ConfigCommand, handle_config};
pub use search::{SearchArgs, handle_search};
pub use source::{SourceCommand, handle_source};
pub use status::handle_status;

use std::sync::Arc;

use anyhow::Result;

use crate::models::Config;
use crate::services::EmbeddingService;
use crate::storage::{KnowledgeStore, open_store};

/// Open the embedding service and the configured store together; the
/// store's vector column is sized from the preferred provider.
pub(crate) async fn open_runtime(
    config: &Config,
) -> Result<(Arc<dyn KnowledgeStore>, Arc<EmbeddingService>)> {
    let embeddings = Arc::new(EmbeddingService::from_config(&config.embedding)?);
    let store = open_store(&config.storage, embeddings.dimension()).await?;
    Ok((store, embeddings))
}

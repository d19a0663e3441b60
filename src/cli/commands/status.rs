//! Status command: store health and statistics.

use anyhow::Result;

use super::open_runtime;
use crate::cli::output::{StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat, StorageDriver};
use crate::storage::KnowledgeStore;

pub async fn handle_status(format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let (store, embeddings) = open_runtime(&config).await?;
    let stats = store.stats().await?;

    if verbose {
        eprintln!(
            "store reachable, native ranking: {}",
            store.supports_vector_search()
        );
    }

    let (driver, location) = match config.storage.driver {
        StorageDriver::Sqlite => (
            "sqlite".to_string(),
            config.storage.path.display().to_string(),
        ),
        StorageDriver::Postgres => ("postgres".to_string(), config.storage.url.clone()),
    };

    let status = StatusInfo {
        driver,
        location,
        embedding_provider: embeddings.provider_label(),
        embedding_dimension: embeddings.dimension(),
        stats,
    };

    print!("{}", formatter.format_status(&status));
    Ok(())
}

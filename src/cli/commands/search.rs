//! Search command: ranked semantic excerpts.

use std::time::Instant;

use anyhow::Result;
use clap::Args;

use super::open_runtime;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, SearchOptions};
use crate::services::Retriever;

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'n', help = "Maximum number of results to return")]
    pub limit: Option<usize>,

    /// Return every matching chunk instead of the best chunk per source
    #[arg(long)]
    pub all_chunks: bool,
}

pub async fn handle_search(args: SearchArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let limit = args.limit.unwrap_or(config.search.default_limit);
    if limit == 0 {
        anyhow::bail!("limit must be at least 1");
    }

    let options = SearchOptions::default()
        .with_limit(limit)
        .with_dedupe_by_source(config.search.dedupe_by_source && !args.all_chunks)
        .with_max_display_len(config.search.max_display_len);

    let (store, embeddings) = open_runtime(&config).await?;
    let retriever = Retriever::new(store, embeddings);

    let results = retriever.search(query, &options).await?;

    if verbose {
        eprintln!(
            "{} result(s) in {}ms",
            results.len(),
            start_time.elapsed().as_millis()
        );
    }

    print!("{}", formatter.format_results(query, &results));
    Ok(())
}

//! Ask command: grounded prompt assembly for a question.

use anyhow::Result;
use clap::Args;

use super::open_runtime;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, SearchOptions};
use crate::services::Retriever;

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question to ground against the store")]
    pub question: String,

    #[arg(long, short = 'n', help = "Maximum number of grounding sources")]
    pub limit: Option<usize>,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);

    let options = SearchOptions::default()
        .with_limit(args.limit.unwrap_or(config.search.default_limit))
        .with_dedupe_by_source(config.search.dedupe_by_source)
        .with_max_display_len(config.search.max_display_len);

    let (store, embeddings) = open_runtime(&config).await?;
    let retriever = Retriever::new(store, embeddings);

    let answer = retriever.ask(question, &options).await?;

    if verbose {
        eprintln!("{} grounding source(s)", answer.results.len());
    }

    print!("{}", formatter.format_answer(&answer));
    Ok(())
}

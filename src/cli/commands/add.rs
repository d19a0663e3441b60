//! Add command: ingest one submission.

use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use super::open_runtime;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, SourceType};
use crate::services::{Chunker, IngestOutcome, Ingestor};
use crate::sources::{IngestInput, TextExtractor};

#[derive(Debug, Args)]
pub struct AddArgs {
    /// Path to a file to ingest
    #[arg(long, short = 'p', conflicts_with = "text")]
    pub file: Option<PathBuf>,

    /// Literal text to ingest (stdin is read when neither --file nor
    /// --text is given)
    #[arg(long, short = 't')]
    pub text: Option<String>,

    /// Source URL, used for provenance and deduplication
    #[arg(long, short = 'u')]
    pub url: Option<String>,

    /// Title override
    #[arg(long)]
    pub title: Option<String>,

    /// Source type hint: article, video, tweet, pdf, or text
    #[arg(long = "type", short = 's')]
    pub source_type: Option<SourceType>,

    /// Comma-separated tags
    #[arg(long)]
    pub tags: Option<String>,
}

pub async fn handle_add(args: AddArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let input = if let Some(path) = args.file {
        IngestInput::File {
            path,
            url: args.url,
            title: args.title,
        }
    } else {
        let content = match args.text {
            Some(text) => text,
            None => {
                let mut buffer = String::new();
                std::io::stdin()
                    .read_to_string(&mut buffer)
                    .context("failed to read stdin")?;
                buffer
            }
        };
        IngestInput::Text {
            content,
            url: args.url,
            title: args.title,
        }
    };

    let tags = parse_tags(args.tags.as_deref().unwrap_or_default());

    let (store, embeddings) = open_runtime(&config).await?;
    let ingestor = Ingestor::new(
        store,
        embeddings,
        Chunker::new(&config.chunking),
        Arc::new(TextExtractor),
    );

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    spinner.set_message("Ingesting...");
    spinner.enable_steady_tick(Duration::from_millis(120));

    let outcome = ingestor.ingest(input, args.source_type, tags).await;
    spinner.finish_and_clear();
    let outcome = outcome?;

    if verbose && let IngestOutcome::Ingested { chunk_count, .. } = &outcome {
        eprintln!("Embedded {} chunk(s)", chunk_count);
    }

    print!("{}", formatter.format_ingest(&outcome));
    Ok(())
}

fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tags() {
        assert_eq!(parse_tags("rust, async , "), vec!["rust", "async"]);
        assert!(parse_tags("").is_empty());
    }
}

//! Source command: browse and delete stored sources.

use anyhow::Result;
use clap::Subcommand;

use super::open_runtime;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat, SourceFilter, SourceType};
use crate::storage::KnowledgeStore;

#[derive(Debug, Subcommand)]
pub enum SourceCommand {
    /// List stored sources
    List {
        /// Filter by source type
        #[arg(long, short = 's')]
        r#type: Option<SourceType>,

        /// Filter by tag
        #[arg(long)]
        tag: Option<String>,

        /// Maximum sources to list
        #[arg(long, short = 'n')]
        limit: Option<u32>,
    },

    /// Show one source in full
    Show {
        #[arg(required = true)]
        id: i64,
    },

    /// Delete a source and all of its chunks
    Delete {
        #[arg(required = true)]
        id: i64,

        /// Skip confirmation prompt
        #[arg(long, short = 'y')]
        force: bool,
    },
}

pub async fn handle_source(cmd: SourceCommand, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);
    let (store, _embeddings) = open_runtime(&config).await?;

    match cmd {
        SourceCommand::List { r#type, tag, limit } => {
            let filter = SourceFilter {
                source_type: r#type,
                tag,
                limit,
            };
            let sources = store.list_sources(&filter).await?;
            if verbose {
                eprintln!("{} source(s)", sources.len());
            }
            print!("{}", formatter.format_sources(&sources));
        }
        SourceCommand::Show { id } => match store.get_source(id).await? {
            Some(source) => print!("{}", formatter.format_source_detail(&source)),
            None => print!("{}", formatter.format_message(&format!("No source with id {}", id))),
        },
        SourceCommand::Delete { id, force } => {
            if !force {
                println!(
                    "This will delete source {} and all of its chunks. Continue? [y/N]",
                    id
                );
                let mut input = String::new();
                std::io::stdin().read_line(&mut input)?;
                if !input.trim().eq_ignore_ascii_case("y") {
                    print!("{}", formatter.format_message("Cancelled."));
                    return Ok(());
                }
            }

            let changes = store.delete_source(id).await?;
            let message = if changes > 0 {
                format!("Deleted source {}", id)
            } else {
                format!("No source with id {}", id)
            };
            print!("{}", formatter.format_message(&message));
        }
    }

    Ok(())
}

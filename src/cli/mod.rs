//! Command-line interface.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Personal knowledge store: ingest, deduplicate, embed, search.
#[derive(Debug, Parser)]
#[command(name = "memoria")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, short = 'f', global = true, help = "Output format: text or json")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Ingest a file, literal text, or stdin into the store
    Add(commands::AddArgs),

    /// Search stored content semantically
    Search(commands::SearchArgs),

    /// Build a grounded prompt for a question (no generation)
    Ask(commands::AskArgs),

    /// Browse and delete stored sources
    #[command(subcommand)]
    Source(commands::SourceCommand),

    /// Store health and statistics
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}

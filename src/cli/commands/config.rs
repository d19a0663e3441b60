//! Config command: inspect and write the TOML configuration.

use anyhow::Result;
use clap::Subcommand;

use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the active configuration
    Show,

    /// Write the default configuration file if none exists
    Init,

    /// Print the configuration file path
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Show => {
            let config = Config::load()?;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&config)?);
                }
                OutputFormat::Text => {
                    print!("{}", toml::to_string_pretty(&config)?);
                }
            }
        }
        ConfigCommand::Init => {
            let path = Config::config_path()
                .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;
            if path.exists() {
                print!(
                    "{}",
                    formatter.format_message(&format!(
                        "Config already exists at {}",
                        path.display()
                    ))
                );
                return Ok(());
            }
            Config::default().save()?;
            print!(
                "{}",
                formatter.format_message(&format!("Wrote default config to {}", path.display()))
            );
        }
        ConfigCommand::Path => match Config::config_path() {
            Some(path) => print!("{}", formatter.format_message(&path.display().to_string())),
            None => print!(
                "{}",
                formatter.format_message("could not determine config directory")
            ),
        },
    }

    Ok(())
}

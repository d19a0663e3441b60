use std::fmt::Write as FmtWrite;

use console::style;
use serde_json::json;

use crate::models::{GroundedAnswer, OutputFormat, RetrievedChunk, SourceRecord};
use crate::services::IngestOutcome;
use crate::storage::StoreStats;

/// Store and embedding facts shown by the status command.
#[derive(Debug, Clone)]
pub struct StatusInfo {
    pub driver: String,
    pub location: String,
    pub embedding_provider: String,
    pub embedding_dimension: usize,
    pub stats: StoreStats,
}

pub trait Formatter {
    fn format_ingest(&self, outcome: &IngestOutcome) -> String;
    fn format_results(&self, query: &str, results: &[RetrievedChunk]) -> String;
    fn format_answer(&self, answer: &GroundedAnswer) -> String;
    fn format_sources(&self, sources: &[SourceRecord]) -> String;
    fn format_source_detail(&self, source: &SourceRecord) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_ingest(&self, outcome: &IngestOutcome) -> String {
        match outcome {
            IngestOutcome::Ingested {
                source_id,
                title,
                source_type,
                chunk_count,
            } => {
                format!(
                    "Ingested \"{}\" ({}) as source {} with {} chunk(s)\n",
                    title, source_type, source_id, chunk_count
                )
            }
            IngestOutcome::Duplicate { source_id } => {
                format!("Already stored as source {} (duplicate)\n", source_id)
            }
        }
    }

    fn format_results(&self, query: &str, results: &[RetrievedChunk]) -> String {
        if results.is_empty() {
            return format!("No results found for: {}\n", query);
        }

        let mut output = String::new();
        writeln!(output, "Results for: \"{}\"\n", query).unwrap();

        for (i, result) in results.iter().enumerate() {
            writeln!(
                output,
                "{}. {} [{}] (score: {:.3})",
                i + 1,
                style(&result.title).bold(),
                result.source_type,
                result.similarity
            )
            .unwrap();
            if let Some(ref url) = result.url {
                writeln!(output, "   {}", style(url).dim()).unwrap();
            }

            let preview: String = result.content.chars().take(200).collect();
            let preview = if result.content.chars().count() > 200 {
                format!("{}...", preview)
            } else {
                preview
            };
            for line in preview.lines() {
                writeln!(output, "   {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_answer(&self, answer: &GroundedAnswer) -> String {
        if answer.results.is_empty() {
            return "No stored content matches this question.\n".to_string();
        }

        let mut output = String::new();
        writeln!(output, "Grounding sources:").unwrap();
        for (i, result) in answer.results.iter().enumerate() {
            writeln!(
                output,
                "  [{}] {} (score: {:.3})",
                i + 1,
                result.title,
                result.similarity
            )
            .unwrap();
        }
        if let Some(ref prompt) = answer.prompt {
            writeln!(output, "\nPrompt for the downstream model:\n").unwrap();
            writeln!(output, "{}", prompt).unwrap();
        }
        output
    }

    fn format_sources(&self, sources: &[SourceRecord]) -> String {
        if sources.is_empty() {
            return "No sources stored.\n".to_string();
        }

        let mut output = String::new();
        for source in sources {
            write!(
                output,
                "{:>5}  [{}] {}",
                source.id, source.source_type, source.title
            )
            .unwrap();
            if let Some(ref url) = source.url {
                write!(output, "  {}", style(url).dim()).unwrap();
            }
            writeln!(output).unwrap();
        }
        output
    }

    fn format_source_detail(&self, source: &SourceRecord) -> String {
        let mut output = String::new();
        writeln!(output, "Source {}", source.id).unwrap();
        writeln!(output, "  Title:   {}", source.title).unwrap();
        writeln!(output, "  Type:    {}", source.source_type).unwrap();
        if let Some(ref url) = source.url {
            writeln!(output, "  URL:     {}", url).unwrap();
        }
        if !source.tags.is_empty() {
            writeln!(output, "  Tags:    {}", source.tags.join(", ")).unwrap();
        }
        writeln!(output, "  Created: {}", source.created_at).unwrap();
        if let Some(ref summary) = source.summary {
            writeln!(output, "  Summary: {}", summary).unwrap();
        }
        writeln!(output, "  Hash:    {}", source.content_hash).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();
        writeln!(output, "Store:      {} ({})", status.driver, status.location).unwrap();
        writeln!(
            output,
            "Embedding:  {} ({} dims)",
            status.embedding_provider, status.embedding_dimension
        )
        .unwrap();
        writeln!(output, "Sources:    {}", status.stats.total_sources).unwrap();
        writeln!(output, "Chunks:     {}", status.stats.total_chunks).unwrap();
        if !status.stats.by_type.is_empty() {
            writeln!(output, "By type:").unwrap();
            for (source_type, count) in &status.stats.by_type {
                writeln!(output, "  {:<10} {}", source_type, count).unwrap();
            }
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }
}

pub struct JsonFormatter;

fn to_json_line<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .map(|s| format!("{}\n", s))
        .unwrap_or_else(|e| format!("{{\"error\":\"{}\"}}\n", e))
}

impl Formatter for JsonFormatter {
    fn format_ingest(&self, outcome: &IngestOutcome) -> String {
        to_json_line(outcome)
    }

    fn format_results(&self, query: &str, results: &[RetrievedChunk]) -> String {
        to_json_line(&json!({ "query": query, "results": results }))
    }

    fn format_answer(&self, answer: &GroundedAnswer) -> String {
        to_json_line(answer)
    }

    fn format_sources(&self, sources: &[SourceRecord]) -> String {
        to_json_line(&sources)
    }

    fn format_source_detail(&self, source: &SourceRecord) -> String {
        to_json_line(source)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        to_json_line(&json!({
            "driver": status.driver,
            "location": status.location,
            "embedding_provider": status.embedding_provider,
            "embedding_dimension": status.embedding_dimension,
            "stats": status.stats,
        }))
    }

    fn format_message(&self, message: &str) -> String {
        to_json_line(&json!({ "message": message }))
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

//! Built-in extractor for plain text and local files.

use async_trait::async_trait;

use super::{Extracted, Extractor, IngestInput};
use crate::error::ExtractError;
use crate::models::SourceType;
use crate::utils::{excerpt, normalize_whitespace};

const EXCERPT_CHARS: usize = 200;
const DERIVED_TITLE_CHARS: usize = 80;
const FALLBACK_TITLE: &str = "Untitled";

/// Extracts UTF-8 text as-is. Binary formats need an external collaborator.
pub struct TextExtractor;

#[async_trait]
impl Extractor for TextExtractor {
    async fn extract(
        &self,
        input: &IngestInput,
        hint: Option<SourceType>,
    ) -> Result<Extracted, ExtractError> {
        match input {
            IngestInput::File { path, url, title } => {
                if path
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
                {
                    return Err(ExtractError::Unsupported(
                        "PDF input requires an external extraction collaborator".to_string(),
                    ));
                }
                let content = tokio::fs::read_to_string(path).await?;
                let title = title
                    .clone()
                    .or_else(|| path.file_stem().map(|s| s.to_string_lossy().to_string()));

                let mut metadata = serde_json::Map::new();
                if let Some(name) = path.file_name() {
                    metadata.insert(
                        "filename".to_string(),
                        name.to_string_lossy().to_string().into(),
                    );
                }
                metadata.insert("size_bytes".to_string(), (content.len() as u64).into());

                assemble(content, url.clone(), title, hint, metadata)
            }
            IngestInput::Text {
                content,
                url,
                title,
            } => assemble(
                content.clone(),
                url.clone(),
                title.clone(),
                hint,
                serde_json::Map::new(),
            ),
        }
    }
}

fn assemble(
    content: String,
    url: Option<String>,
    title: Option<String>,
    hint: Option<SourceType>,
    metadata: serde_json::Map<String, serde_json::Value>,
) -> Result<Extracted, ExtractError> {
    let normalized = normalize_whitespace(&content);
    if normalized.is_empty() {
        return Err(ExtractError::EmptyContent(
            "input has no text content".to_string(),
        ));
    }

    let source_type = hint
        .or_else(|| url.as_deref().map(SourceType::infer_from_url))
        .unwrap_or_default();

    // Title lookups are best-effort; degrade to a derived placeholder.
    let title = title
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| derive_title(&normalized));

    let summary = excerpt(&normalized, EXCERPT_CHARS);

    Ok(Extracted {
        url,
        title,
        content,
        excerpt: Some(summary),
        source_type,
        metadata,
    })
}

fn derive_title(text: &str) -> String {
    let head: String = text.chars().take(DERIVED_TITLE_CHARS).collect();
    let first = head
        .split(['.', '!', '?'])
        .next()
        .map(str::trim)
        .unwrap_or("");
    if first.is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        first.to_string()
    }
}

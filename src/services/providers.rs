//! HTTP embedding backends.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::EmbeddingError;

pub const OPENAI_NAME: &str = "openai";
pub const GEMINI_NAME: &str = "gemini";

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// A remote embedding provider: text in, fixed-dimension vector out.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    fn name(&self) -> &'static str;

    fn model(&self) -> &str;

    /// Declared output dimension for this provider/model pair.
    fn dimension(&self) -> usize;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

fn build_client(timeout: Duration) -> Result<Client, EmbeddingError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EmbeddingError::Connection(e.to_string()))
}

fn map_send_error(e: reqwest::Error) -> EmbeddingError {
    if e.is_timeout() {
        EmbeddingError::Timeout
    } else {
        EmbeddingError::Connection(e.to_string())
    }
}

async fn error_from_status(response: reqwest::Response) -> EmbeddingError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    EmbeddingError::Status { status, body }
}

/// OpenAI embeddings API client.
pub struct OpenAiBackend {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    data: Vec<OpenAiEmbedding>,
}

#[derive(Debug, Deserialize)]
struct OpenAiEmbedding {
    embedding: Vec<f32>,
}

impl OpenAiBackend {
    pub fn new(
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key,
            model: model.into(),
            base_url: OPENAI_BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingBackend for OpenAiBackend {
    fn name(&self) -> &'static str {
        OPENAI_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        match self.model.as_str() {
            "text-embedding-3-large" => 3072,
            _ => 1536,
        }
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(EmbeddingError::MissingCredential(OPENAI_NAME))?;

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&OpenAiRequest {
                model: &self.model,
                input: text,
            })
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(error_from_status(response).await);
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                EmbeddingError::InvalidResponse("empty embedding in response".to_string())
            })
    }
}

/// Gemini embeddings API client.
pub struct GeminiBackend {
    client: Client,
    api_key: Option<String>,
    model: String,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    content: GeminiContent<'a>,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    parts: Vec<GeminiPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiPart<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    embedding: GeminiEmbedding,
}

#[derive(Debug, Deserialize)]
struct GeminiEmbedding {
    values: Vec<f32>,
}

impl GeminiBackend {
    pub fn new(
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: build_client(timeout)?,
            api_key,
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        GEMINI_NAME
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        768
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(EmbeddingError::MissingCredential(GEMINI_NAME))?;

        let url = format!("{}/models/{}:embedContent", self.base_url, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&GeminiRequest {
                content: GeminiContent {
                    parts: vec![GeminiPart { text }],
                },
            })
            .send()
            .await
            .map_err(map_send_error)?;

        if !response.status().is_success() {
            return Err(error_from_status(response).await);
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

        if parsed.embedding.values.is_empty() {
            return Err(EmbeddingError::InvalidResponse(
                "empty embedding in response".to_string(),
            ));
        }
        Ok(parsed.embedding.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_credential_fails_fast() {
        let backend =
            OpenAiBackend::new("text-embedding-3-small", None, Duration::from_secs(5)).unwrap();
        let result = backend.embed("hello").await;
        assert!(matches!(
            result,
            Err(EmbeddingError::MissingCredential(OPENAI_NAME))
        ));
    }

    #[test]
    fn test_declared_dimensions() {
        let openai =
            OpenAiBackend::new("text-embedding-3-small", None, Duration::from_secs(5)).unwrap();
        assert_eq!(openai.dimension(), 1536);

        let large =
            OpenAiBackend::new("text-embedding-3-large", None, Duration::from_secs(5)).unwrap();
        assert_eq!(large.dimension(), 3072);

        let gemini =
            GeminiBackend::new("text-embedding-004", None, Duration::from_secs(5)).unwrap();
        assert_eq!(gemini.dimension(), 768);
    }
}

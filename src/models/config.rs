use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::search::OutputFormat;

pub const DEFAULT_OPENAI_MODEL: &str = "text-embedding-3-small";
pub const DEFAULT_GEMINI_MODEL: &str = "text-embedding-004";
pub const DEFAULT_POSTGRES_URL: &str = "postgres://localhost:5432/memoria";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub search: SearchConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("memoria").join("config.toml"))
    }

    pub fn load() -> Result<Self, crate::error::ConfigError> {
        if let Some(path) = Self::config_path()
            && path.exists()
        {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            return Ok(config);
        }
        Ok(Self::default())
    }

    pub fn save(&self) -> Result<(), crate::error::ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            crate::error::ConfigError::Path("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Preferred provider, tried first: "openai" or "gemini".
    #[serde(default = "default_preferred")]
    pub preferred: String,

    #[serde(default = "default_openai_model")]
    pub openai_model: String,

    #[serde(default = "default_gemini_model")]
    pub gemini_model: String,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_preferred() -> String {
    "openai".to_string()
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

fn default_gemini_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_timeout() -> u64 {
    60
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            preferred: default_preferred(),
            openai_model: default_openai_model(),
            gemini_model: default_gemini_model(),
            timeout_secs: default_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_overlap")]
    pub overlap: usize,

    #[serde(default = "default_min_chunk_size")]
    pub min_chunk_size: usize,
}

fn default_chunk_size() -> usize {
    800
}

fn default_overlap() -> usize {
    200
}

fn default_min_chunk_size() -> usize {
    100
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
            min_chunk_size: default_min_chunk_size(),
        }
    }
}

/// Persistence backend driver.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageDriver {
    #[default]
    Sqlite,
    Postgres,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub driver: StorageDriver,

    /// Database file for the SQLite driver.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    /// Connection URL for the Postgres driver.
    #[serde(default = "default_postgres_url")]
    pub url: String,
}

fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("memoria").join("memoria.db"))
        .unwrap_or_else(|| PathBuf::from("memoria.db"))
}

fn default_postgres_url() -> String {
    DEFAULT_POSTGRES_URL.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: StorageDriver::default(),
            path: default_db_path(),
            url: default_postgres_url(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: usize,

    #[serde(default = "default_max_display_len")]
    pub max_display_len: usize,

    #[serde(default = "default_dedupe_by_source")]
    pub dedupe_by_source: bool,

    #[serde(default)]
    pub default_format: OutputFormat,
}

fn default_limit() -> usize {
    10
}

fn default_max_display_len() -> usize {
    2500
}

fn default_dedupe_by_source() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_display_len: default_max_display_len(),
            dedupe_by_source: default_dedupe_by_source(),
            default_format: OutputFormat::Text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.embedding.preferred, "openai");
        assert_eq!(config.chunking.chunk_size, 800);
        assert_eq!(config.chunking.overlap, 200);
        assert_eq!(config.chunking.min_chunk_size, 100);
        assert_eq!(config.storage.driver, StorageDriver::Sqlite);
        assert_eq!(config.search.default_limit, 10);
    }

    #[test]
    fn test_partial_config_parses_with_defaults() {
        let config: Config = toml::from_str(
            r#"
            [storage]
            driver = "postgres"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.driver, StorageDriver::Postgres);
        assert_eq!(config.embedding.openai_model, DEFAULT_OPENAI_MODEL);
        assert_eq!(config.search.max_display_len, 2500);
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let serialized = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.embedding.timeout_secs, config.embedding.timeout_secs);
    }
}

//! Configuration file support for ragsift
//!
//! Config file location: ~/.config/ragsift/config.toml
//!
//! Example config:
//! ```toml
//! [embedding]
//! provider = "ollama"  # ollama, hashed
//! model = "nomic-embed-text"
//! host = "http://localhost:11434"  # for ollama
//!
//! [query]
//! max_chunks = 4
//! similarity_threshold = 0.0
//! search_timeout_secs = 30
//!
//! [ingest]
//! chunk_size = 256
//! chunk_overlap = 32
//! max_file_size_kb = 1024
//! ```

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::retrieval::QuerySettings;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub ingest: IngestConfig,
}

/// Embedding provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider type: ollama, hashed
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Host for Ollama (e.g., http://localhost:11434)
    pub host: Option<String>,

    /// Vector dimensions, when the model default is not wanted
    pub dimensions: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            host: None,
            dimensions: None,
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}

fn default_model() -> String {
    "nomic-embed-text".to_string()
}

/// Default query settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Results per query (1-20)
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    /// Minimum similarity score (0.0-1.0)
    #[serde(default)]
    pub similarity_threshold: f32,

    /// Budget for one similarity-search call
    #[serde(default = "default_search_timeout_secs")]
    pub search_timeout_secs: u64,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            max_chunks: default_max_chunks(),
            similarity_threshold: 0.0,
            search_timeout_secs: default_search_timeout_secs(),
        }
    }
}

impl QueryConfig {
    /// Unfiltered settings built from these defaults
    pub fn settings(&self) -> QuerySettings {
        QuerySettings::new(self.max_chunks, self.similarity_threshold)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }
}

fn default_max_chunks() -> usize {
    4
}

fn default_search_timeout_secs() -> u64 {
    30
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Chunk size in tokens
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Chunk overlap in tokens
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Maximum file size in KB
    #[serde(default = "default_max_file_size_kb")]
    pub max_file_size_kb: usize,

    /// File types to include
    pub file_types: Option<Vec<String>>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size_kb: default_max_file_size_kb(),
            file_types: None,
        }
    }
}

fn default_chunk_size() -> usize {
    256
}

fn default_chunk_overlap() -> usize {
    32
}

fn default_max_file_size_kb() -> usize {
    1024
}

const EXAMPLE_CONFIG: &str = r#"# ragsift configuration
# Location: ~/.config/ragsift/config.toml

[embedding]
# Provider: ollama, hashed (offline, no model server needed)
provider = "ollama"

# Model name (Ollama: nomic-embed-text, mxbai-embed-large, all-minilm)
model = "nomic-embed-text"

# Ollama host (default: http://localhost:11434)
# host = "http://localhost:11434"

# Vector dimensions (default: model-specific, 384 for hashed)
# dimensions = 768

[query]
# Results per query, 1-20 (default: 4)
max_chunks = 4

# Minimum similarity score, 0.0-1.0 (default: 0.0)
similarity_threshold = 0.0

# Similarity-search timeout in seconds (default: 30)
search_timeout_secs = 30

[ingest]
# Chunk size in tokens (default: 256)
chunk_size = 256

# Chunk overlap in tokens (default: 32)
chunk_overlap = 32

# Max file size in KB (default: 1024 = 1MB)
max_file_size_kb = 1024

# File types to include (default: common text, doc and code files)
# file_types = [".md", ".txt", ".rs"]
"#;

impl Config {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ragsift")
            .join("config.toml")
    }

    /// Load config from file, returning defaults if not found
    pub fn load() -> Self {
        let path = Self::config_path();
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => {
                        tracing::debug!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to parse config file: {}", e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config file: {}", e);
                }
            }
        }
        Self::default()
    }

    /// Write the commented example config, replacing any existing file when `force` is set.
    ///
    /// Returns whether the file was written.
    pub fn write_example(force: bool) -> anyhow::Result<bool> {
        let path = Self::config_path();
        if path.exists() && !force {
            return Ok(false);
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, EXAMPLE_CONFIG)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.embedding.provider, "ollama");
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.query.max_chunks, 4);
        assert_eq!(config.query.search_timeout(), Duration::from_secs(30));
        assert_eq!(config.ingest.chunk_size, 256);
        assert_eq!(config.ingest.chunk_overlap, 32);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[embedding]
provider = "hashed"
dimensions = 128

[query]
max_chunks = 8
similarity_threshold = 0.25

[ingest]
chunk_size = 512
file_types = [".md"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.embedding.provider, "hashed");
        assert_eq!(config.embedding.dimensions, Some(128));
        assert_eq!(config.query.search_timeout_secs, 30);
        assert_eq!(config.ingest.chunk_size, 512);
        assert_eq!(config.ingest.file_types.as_deref(), Some(&[".md".to_string()][..]));

        let settings = config.query.settings();
        assert_eq!(settings.max_chunks, 8);
        assert_eq!(settings.similarity_threshold, 0.25);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_example_config_parses() {
        let config: Config = toml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(config.query.max_chunks, 4);
        assert_eq!(config.ingest.max_file_size_kb, 1024);
    }
}

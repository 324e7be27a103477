//! Embedding module - compute embeddings from text

mod hashed;
mod ollama;
mod traits;

pub use hashed::HashedEmbedding;
pub use ollama::OllamaEmbedding;
pub use traits::EmbeddingModel;

use async_trait::async_trait;
use tracing::info;

/// Embedding mode configuration
#[derive(Debug, Clone)]
pub enum EmbeddingMode {
    Ollama {
        host: Option<String>,
        dimensions: Option<usize>,
    },
    Hashed {
        dimensions: usize,
    },
}

impl EmbeddingMode {
    /// Build a mode from a provider name as written in config or on the CLI
    pub fn from_provider(
        provider: &str,
        host: Option<String>,
        dimensions: Option<usize>,
    ) -> anyhow::Result<Self> {
        match provider {
            "ollama" => Ok(EmbeddingMode::Ollama { host, dimensions }),
            "hashed" => Ok(EmbeddingMode::Hashed {
                dimensions: dimensions.unwrap_or(DEFAULT_HASHED_DIMENSIONS),
            }),
            _ => anyhow::bail!("Unknown embedding provider: {}", provider),
        }
    }
}

/// Dimensions used by the hashed provider when none are configured
pub const DEFAULT_HASHED_DIMENSIONS: usize = 384;

/// Unified embedding provider
pub struct EmbeddingProvider {
    model_name: String,
    dimensions: usize,
    inner: EmbeddingProviderInner,
}

enum EmbeddingProviderInner {
    Ollama(OllamaEmbedding),
    Hashed(HashedEmbedding),
}

impl EmbeddingProvider {
    /// Create a new embedding provider
    pub fn new(model_name: String, mode: EmbeddingMode) -> anyhow::Result<Self> {
        let (inner, dimensions) = match mode {
            EmbeddingMode::Ollama { host, dimensions } => {
                let provider = OllamaEmbedding::new(model_name.clone(), host, dimensions)?;
                let dims = provider.dimensions();
                (EmbeddingProviderInner::Ollama(provider), dims)
            }
            EmbeddingMode::Hashed { dimensions } => {
                let provider = HashedEmbedding::new(dimensions)?;
                (EmbeddingProviderInner::Hashed(provider), dimensions)
            }
        };

        info!(
            "Initialized embedding provider: {} ({} dims)",
            model_name, dimensions
        );

        Ok(Self {
            model_name,
            dimensions,
            inner,
        })
    }

    /// Get model name
    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[async_trait]
impl EmbeddingModel for EmbeddingProvider {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        match &self.inner {
            EmbeddingProviderInner::Ollama(p) => p.embed(texts).await,
            EmbeddingProviderInner::Hashed(p) => p.embed(texts).await,
        }
    }
}

//! Embedding model traits

use async_trait::async_trait;

/// Text to vector model consumed by ingestion and free-text queries
#[async_trait]
pub trait EmbeddingModel: Send + Sync {
    /// Get embedding dimensions
    fn dimensions(&self) -> usize;

    /// Compute one embedding per input text, in order
    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>>;
}

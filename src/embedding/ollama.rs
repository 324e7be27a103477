//! Ollama embedding provider

use std::env;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::traits::EmbeddingModel;
use crate::http::{check_response, create_client};

/// Ollama recommends batches of at most 32 inputs
const BATCH_SIZE: usize = 32;

/// Ollama embedding provider
pub struct OllamaEmbedding {
    client: Client,
    host: String,
    model_name: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedding {
    /// Create a new Ollama embedding provider
    pub fn new(
        model_name: String,
        host: Option<String>,
        dimensions: Option<usize>,
    ) -> anyhow::Result<Self> {
        let host = host
            .or_else(|| env::var("RAGSIFT_OLLAMA_HOST").ok())
            .or_else(|| env::var("OLLAMA_HOST").ok())
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        let dimensions = dimensions.unwrap_or_else(|| default_dimensions(&model_name));

        info!(
            "Ollama embedding provider: {} @ {} ({} dims)",
            model_name, host, dimensions
        );

        Ok(Self {
            client: create_client()?,
            host: host.trim_end_matches('/').to_string(),
            model_name,
            dimensions,
        })
    }
}

/// Default dimensions for common embedding models
fn default_dimensions(model_name: &str) -> usize {
    match model_name.split(':').next().unwrap_or(model_name) {
        "nomic-embed-text" => 768,
        "mxbai-embed-large" => 1024,
        "all-minilm" => 384,
        "bge-m3" => 1024,
        "snowflake-arctic-embed" => 1024,
        _ => 768,
    }
}

#[async_trait]
impl EmbeddingModel for OllamaEmbedding {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(BATCH_SIZE) {
            let request = EmbedRequest {
                model: &self.model_name,
                input: batch,
            };

            let response = self
                .client
                .post(format!("{}/api/embed", self.host))
                .json(&request)
                .send()
                .await?;
            let response = check_response(response, "Ollama").await?;

            let embed_response: EmbedResponse = response.json().await?;
            if embed_response.embeddings.len() != batch.len() {
                anyhow::bail!(
                    "Ollama returned {} embeddings for {} inputs",
                    embed_response.embeddings.len(),
                    batch.len()
                );
            }
            debug!("Embedded batch of {}", batch.len());
            all_embeddings.extend(embed_response.embeddings);
        }

        Ok(all_embeddings)
    }
}

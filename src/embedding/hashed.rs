//! Hashed bag-of-words embeddings
//!
//! Deterministic and offline: every token is hashed into one of `dimensions`
//! buckets with a hash-derived sign, then the vector is L2-normalized. Texts
//! that share words land close together under cosine similarity, which is
//! enough for tests and for trying the CLI without a model server.

use std::hash::Hasher;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use rustc_hash::FxHasher;

use super::traits::EmbeddingModel;

static TOKEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[a-zA-Z0-9]+").expect("token regex is valid")
});

pub struct HashedEmbedding {
    dimensions: usize,
}

impl HashedEmbedding {
    pub fn new(dimensions: usize) -> anyhow::Result<Self> {
        if dimensions == 0 {
            anyhow::bail!("Hashed embedding needs at least one dimension");
        }
        Ok(Self { dimensions })
    }

    /// Embed a single text
    pub fn embed_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];

        for token in tokenize(text) {
            let mut hasher = FxHasher::default();
            hasher.write(token.as_bytes());
            let hash = hasher.finish();

            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl EmbeddingModel for HashedEmbedding {
    fn dimensions(&self) -> usize {
        self.dimensions
    }

    async fn embed(&self, texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    TOKEN_REGEX
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
        .filter(|s| s.len() > 1)
}

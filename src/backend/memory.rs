//! Exact in-memory index using cosine similarity
//!
//! Brute force over every stored vector. Fine for tests, demos and corpora of
//! a few thousand chunks.

use std::cmp::Ordering;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use crate::error::IndexError;
use crate::retrieval::{ChunkId, DocumentId, ScoredCandidate};

use super::traits::{IndexEntry, VectorIndexClient};

#[derive(Debug)]
pub struct MemoryIndex {
    dimensions: usize,
    entries: RwLock<FxHashMap<ChunkId, IndexEntry>>,
}

impl MemoryIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn check_dimensions(&self, len: usize) -> Result<(), IndexError> {
        if len != self.dimensions {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimensions,
                actual: len,
            });
        }
        Ok(())
    }
}

/// Cosine similarity; 0.0 if either vector has zero magnitude
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[async_trait]
impl VectorIndexClient for MemoryIndex {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredCandidate>, IndexError> {
        self.check_dimensions(query.len())?;

        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredCandidate> = entries
            .values()
            .map(|entry| ScoredCandidate {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(&entry.vector, query),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
        scored.truncate(k);
        Ok(scored)
    }

    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        for entry in &entries {
            self.check_dimensions(entry.vector.len())?;
        }

        let mut store = self.entries.write().await;
        for entry in entries {
            store.insert(entry.chunk.id.clone(), entry);
        }
        Ok(())
    }

    async fn remove_document(&self, document_id: &DocumentId) -> Result<usize, IndexError> {
        let mut store = self.entries.write().await;
        let before = store.len();
        store.retain(|_, entry| entry.chunk.document_id != *document_id);
        Ok(before - store.len())
    }

    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

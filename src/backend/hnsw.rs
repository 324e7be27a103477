//! HNSW backend using usearch crate

use std::sync::Arc;

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::IndexError;
use crate::retrieval::{Chunk, ChunkId, DocumentId, ScoredCandidate};

use super::traits::{IndexEntry, VectorIndexClient};

/// Graph parameters for the HNSW index
#[derive(Debug, Clone, Copy)]
pub struct HnswParams {
    pub connectivity: usize,
    pub expansion_add: usize,
    pub expansion_search: usize,
}

impl Default for HnswParams {
    fn default() -> Self {
        Self {
            connectivity: 32,
            expansion_add: 64,
            expansion_search: 64,
        }
    }
}

/// Approximate in-memory index on usearch with cosine metric
pub struct HnswIndex {
    dimensions: usize,
    state: RwLock<HnswState>,
}

struct HnswState {
    index: Index,
    keys: FxHashMap<ChunkId, u64>,
    chunks: FxHashMap<u64, Arc<Chunk>>,
    next_key: u64,
}

impl HnswState {
    /// Add vectors under the given keys. If any add fails, every key added
    /// by this call is removed again and the error returned.
    fn add_all(&mut self, vectors: &[(u64, &[f32])]) -> Result<(), IndexError> {
        for (added, (key, vector)) in vectors.iter().enumerate() {
            if let Err(e) = self.index.add(*key, vector) {
                for (rollback, _) in &vectors[..added] {
                    if let Err(e) = self.index.remove(*rollback) {
                        warn!("Failed to roll back HNSW vector {}: {}", rollback, e);
                    }
                }
                return Err(IndexError::Upsert(e.to_string()));
            }
        }
        Ok(())
    }
}

impl HnswIndex {
    pub fn new(dimensions: usize, params: HnswParams) -> Result<Self, IndexError> {
        let options = IndexOptions {
            dimensions,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: params.connectivity,
            expansion_add: params.expansion_add,
            expansion_search: params.expansion_search,
            multi: false,
        };

        let index = Index::new(&options).map_err(|e| IndexError::Upsert(e.to_string()))?;

        info!(
            "HNSW index ready: {} dims, connectivity={}",
            dimensions, params.connectivity
        );

        Ok(Self {
            dimensions,
            state: RwLock::new(HnswState {
                index,
                keys: FxHashMap::default(),
                chunks: FxHashMap::default(),
                next_key: 0,
            }),
        })
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

#[async_trait]
impl VectorIndexClient for HnswIndex {
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredCandidate>, IndexError> {
        self.check_dimensions(query.len())?;

        let state = self.state.read().await;
        if k == 0 || state.chunks.is_empty() {
            return Ok(Vec::new());
        }

        let matches = state
            .index
            .search(query, k)
            .map_err(|e| IndexError::Search(e.to_string()))?;

        // Cosine distance is 1 - similarity
        let candidates = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .filter_map(|(key, distance)| {
                state.chunks.get(key).map(|chunk| ScoredCandidate {
                    chunk: chunk.clone(),
                    score: 1.0 - *distance,
                })
            })
            .collect();

        Ok(candidates)
    }

    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError> {
        for entry in &entries {
            self.check_dimensions(entry.vector.len())?;
        }

        let mut state = self.state.write().await;

        let needed = state.index.size() + entries.len();
        if needed > state.index.capacity() {
            state
                .index
                .reserve(needed.next_power_of_two())
                .map_err(|e| IndexError::Upsert(e.to_string()))?;
        }

        // Add every new vector under a fresh key before touching old ones
        let first_key = state.next_key;
        let staged: Vec<(u64, &[f32])> = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| (first_key + i as u64, entry.vector.as_slice()))
            .collect();
        state.add_all(&staged)?;
        state.next_key += entries.len() as u64;

        for (offset, entry) in entries.into_iter().enumerate() {
            let key = first_key + offset as u64;
            if let Some(old_key) = state.keys.insert(entry.chunk.id.clone(), key) {
                state.chunks.remove(&old_key);
                // An unmapped key is never returned by search
                if let Err(e) = state.index.remove(old_key) {
                    warn!("Failed to drop replaced HNSW vector {}: {}", old_key, e);
                }
            }
            state.chunks.insert(key, entry.chunk);
        }

        debug!("HNSW index holds {} vectors", state.chunks.len());
        Ok(())
    }

    async fn remove_document(&self, document_id: &DocumentId) -> Result<usize, IndexError> {
        let mut state = self.state.write().await;

        let doomed: Vec<(ChunkId, u64)> = state
            .keys
            .iter()
            .filter(|(_, key)| {
                state
                    .chunks
                    .get(key)
                    .is_some_and(|c| c.document_id == *document_id)
            })
            .map(|(id, key)| (id.clone(), *key))
            .collect();

        for (id, key) in &doomed {
            state
                .index
                .remove(*key)
                .map_err(|e| IndexError::Upsert(e.to_string()))?;
            state.keys.remove(id);
            state.chunks.remove(key);
        }

        Ok(doomed.len())
    }

    async fn len(&self) -> usize {
        self.state.read().await.chunks.len()
    }
}

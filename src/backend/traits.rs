//! Backend traits for vector search

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::IndexError;
use crate::retrieval::{Chunk, DocumentId, ScoredCandidate};

/// A chunk together with the vector the index should own for it
#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: Arc<Chunk>,
    pub vector: Vec<f32>,
}

/// Externally owned similarity-search capability.
///
/// The chunk id is the handle under which the index keeps a vector;
/// upserting an existing id replaces it.
#[async_trait]
pub trait VectorIndexClient: Send + Sync {
    /// Nearest neighbours of `query`, ordered by descending similarity,
    /// at most `k` of them. Must support `k` up to 20.
    async fn search(&self, query: &[f32], k: usize) -> Result<Vec<ScoredCandidate>, IndexError>;

    /// Insert or replace vectors
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<(), IndexError>;

    /// Drop every vector belonging to a document. Owner-side operation;
    /// returns how many vectors were removed.
    async fn remove_document(&self, document_id: &DocumentId) -> Result<usize, IndexError>;

    /// Number of vectors in the index
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

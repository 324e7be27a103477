//! Backend module - vector index adapters (exact in-memory, HNSW)

mod hnsw;
mod memory;
mod traits;

pub use hnsw::{HnswIndex, HnswParams};
pub use memory::MemoryIndex;
pub use traits::{IndexEntry, VectorIndexClient};

use std::str::FromStr;
use std::sync::Arc;

use crate::error::IndexError;

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendType {
    /// Exact brute-force cosine search
    Memory,
    /// Approximate search on usearch
    Hnsw,
}

impl BackendType {
    /// Create an empty index of this type
    pub fn create(self, dimensions: usize) -> Result<Arc<dyn VectorIndexClient>, IndexError> {
        match self {
            BackendType::Memory => Ok(Arc::new(MemoryIndex::new(dimensions))),
            BackendType::Hnsw => Ok(Arc::new(HnswIndex::new(dimensions, HnswParams::default())?)),
        }
    }
}

impl FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "hnsw" => Ok(Self::Hnsw),
            _ => Err(format!("Unknown backend: {}", s)),
        }
    }
}

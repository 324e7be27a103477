//! Error types for ragsift

use std::time::Duration;

use thiserror::Error;

use crate::retrieval::DocumentId;

/// Main error type for retrieval operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Input rejected before reaching the filter or ranker
    #[error("validation error: {0}")]
    Validation(String),

    /// Document identifier is not registered
    #[error("document not found: {0}")]
    NotFound(DocumentId),

    /// The external similarity search failed or timed out
    #[error("retrieval failed: {0}")]
    RetrievalFailed(#[source] IndexError),

    /// Writing chunk vectors into the external index failed
    #[error("index write failed: {0}")]
    IndexWrite(#[source] IndexError),

    /// Embedding generation failed
    #[error("embedding error: {0}")]
    Embedding(String),

    /// Reading a document or its sidecar failed
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A sidecar label file is not valid JSON
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors reported by a vector index.
#[derive(Error, Debug)]
pub enum IndexError {
    #[error("search timed out after {0:?}")]
    Timeout(Duration),

    #[error("search failed: {0}")]
    Search(String),

    #[error("upsert failed: {0}")]
    Upsert(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Result type alias for ragsift operations.
pub type Result<T> = std::result::Result<T, Error>;

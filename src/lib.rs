//! ragsift - adaptive filtered retrieval
//!
//! Given a query embedding plus optional tag and metadata constraints, pull a
//! right-sized candidate pool from a similarity index, then filter, threshold
//! and truncate it into a bounded ranked result. Ingestion stamps every chunk
//! with an immutable snapshot of its document's labels so filtering never
//! contends with concurrent writers.

pub mod backend;
pub mod chunker;
pub mod config;
pub mod embedding;
pub mod error;
pub mod http;
pub mod retrieval;

pub use error::{Error, IndexError, Result};
pub use retrieval::{
    CancellationToken, DocumentId, IngestRequest, QueryOutcome, QuerySettings, RetrievalEngine,
    ScoredChunk,
};

//! Adaptive filtered retrieval
//!
//! Query path: [`plan_fetch_width`] sizes the candidate pool, the
//! [`VectorIndexClient`](crate::backend::VectorIndexClient) returns scored
//! candidates, and [`rank`] applies the threshold cutoff, the tag/metadata
//! filter and truncation. Filtering reads each chunk's immutable snapshot,
//! never the [`MetadataStore`].

mod cancel;
mod deletion;
mod engine;
pub mod filter;
mod ingest;
mod planner;
mod ranker;
mod settings;
mod store;
mod types;

pub use cancel::CancellationToken;
pub use engine::{EngineStats, RetrievalEngine, DEFAULT_SEARCH_TIMEOUT};
pub use filter::{parse_metadata_filter, parse_tags, passes};
pub use ingest::{stamp_chunks, IngestionPipeline};
pub use planner::{plan_fetch_width, FILTERED_FETCH_MULTIPLIER, MAX_FETCH_WIDTH};
pub use ranker::{rank, rank_with_cancel};
pub use settings::{QueryOutcome, QueryRequest, QuerySettings, MAX_CHUNKS, MIN_CHUNKS};
pub use store::MetadataStore;
pub use types::{
    metadata_from_json, Chunk, ChunkId, ChunkSnapshot, DocumentEntry, DocumentId, IngestRequest,
    Metadata, MetadataValue, ScoredCandidate, ScoredChunk, TagSet,
};

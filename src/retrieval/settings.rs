//! Query settings and the upstream request contract

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::types::{metadata_from_json, Metadata, MetadataValue, ScoredChunk, TagSet};

/// Smallest accepted `max_chunks`
pub const MIN_CHUNKS: usize = 1;

/// Largest accepted `max_chunks`
pub const MAX_CHUNKS: usize = 20;

/// Per-query retrieval settings
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySettings {
    /// Number of results to return (1-20)
    pub max_chunks: usize,
    /// Minimum similarity score (0.0-1.0)
    pub similarity_threshold: f32,
    /// Any one matching tag qualifies; empty means no constraint
    pub tag_filter: TagSet,
    /// Every key must match; empty means no constraint
    pub metadata_filter: Metadata,
}

impl QuerySettings {
    pub fn new(max_chunks: usize, similarity_threshold: f32) -> Self {
        Self {
            max_chunks,
            similarity_threshold,
            tag_filter: TagSet::new(),
            metadata_filter: Metadata::new(),
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_filter = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata_filter(mut self, filter: Metadata) -> Self {
        self.metadata_filter = filter;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata_filter.insert(key.into(), value.into());
        self
    }

    /// Whether any tag or metadata constraint is active
    pub fn has_filters(&self) -> bool {
        !self.tag_filter.is_empty() || !self.metadata_filter.is_empty()
    }

    /// Reject out-of-range values; nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        if !(MIN_CHUNKS..=MAX_CHUNKS).contains(&self.max_chunks) {
            return Err(Error::Validation(format!(
                "max_chunks must be between {} and {}, got {}",
                MIN_CHUNKS, MAX_CHUNKS, self.max_chunks
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(Error::Validation(format!(
                "similarity_threshold must be between 0.0 and 1.0, got {}",
                self.similarity_threshold
            )));
        }
        Ok(())
    }
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self::new(default_max_chunks(), 0.0)
    }
}

/// Request body as produced by the HTTP/CLI layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    #[serde(default = "default_max_chunks")]
    pub max_chunks: usize,

    #[serde(default)]
    pub similarity_threshold: f32,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub metadata_filter: serde_json::Map<String, serde_json::Value>,
}

fn default_max_chunks() -> usize {
    4
}

impl TryFrom<QueryRequest> for QuerySettings {
    type Error = Error;

    fn try_from(request: QueryRequest) -> Result<Self> {
        let metadata_filter = metadata_from_json(&request.metadata_filter)?;
        let settings = QuerySettings::new(request.max_chunks, request.similarity_threshold)
            .with_tags(request.tags)
            .with_metadata_filter(metadata_filter);
        settings.validate()?;
        Ok(settings)
    }
}

/// Result of a query: either a ranked list or a cancellation signal.
///
/// `Cancelled` means no result is available yet, not an empty result set.
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Ranked(Vec<ScoredChunk>),
    Cancelled,
}

impl QueryOutcome {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, QueryOutcome::Cancelled)
    }

    /// Ranked results, or `None` when cancelled
    pub fn into_results(self) -> Option<Vec<ScoredChunk>> {
        match self {
            QueryOutcome::Ranked(results) => Some(results),
            QueryOutcome::Cancelled => None,
        }
    }
}

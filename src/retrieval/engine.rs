//! Retrieval engine - wires the store, pipeline, planner and ranker together

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::backend::VectorIndexClient;
use crate::embedding::EmbeddingModel;
use crate::error::{Error, IndexError, Result};

use super::cancel::CancellationToken;
use super::ingest::IngestionPipeline;
use super::planner::plan_fetch_width;
use super::ranker::rank_with_cancel;
use super::settings::{QueryOutcome, QuerySettings};
use super::store::MetadataStore;
use super::types::{DocumentEntry, DocumentId, IngestRequest};

/// Default budget for one similarity-search call
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Counts reported by [`RetrievalEngine::stats`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineStats {
    /// Registered documents
    pub documents: usize,
    /// Chunks owned by registered documents
    pub chunks: usize,
    /// Vectors held by the index, including those of deleted documents
    pub indexed_vectors: usize,
}

/// Adaptive filtered retrieval over an externally owned similarity index.
///
/// Safe to share behind an `Arc` between concurrent callers. Mutations of
/// the same document id must be serialized by the caller.
pub struct RetrievalEngine {
    pub(super) store: Arc<MetadataStore>,
    index: Arc<dyn VectorIndexClient>,
    embedder: Arc<dyn EmbeddingModel>,
    pipeline: IngestionPipeline,
    search_timeout: Duration,
}

impl RetrievalEngine {
    pub fn new(index: Arc<dyn VectorIndexClient>, embedder: Arc<dyn EmbeddingModel>) -> Self {
        Self::with_store(Arc::new(MetadataStore::new()), index, embedder)
    }

    /// Build around an existing store
    pub fn with_store(
        store: Arc<MetadataStore>,
        index: Arc<dyn VectorIndexClient>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        let pipeline = IngestionPipeline::new(store.clone(), index.clone(), embedder.clone());
        Self {
            store,
            index,
            embedder,
            pipeline,
            search_timeout: DEFAULT_SEARCH_TIMEOUT,
        }
    }

    pub fn with_search_timeout(mut self, timeout: Duration) -> Self {
        self.search_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.store
    }

    pub fn index(&self) -> &Arc<dyn VectorIndexClient> {
        &self.index
    }

    /// Ingest a document under a freshly allocated id.
    ///
    /// Never deduplicates: identical content ingested twice yields two ids.
    pub async fn ingest(&self, request: IngestRequest) -> Result<DocumentId> {
        let document_id = DocumentId::new();
        self.pipeline.add_documents(document_id, request).await?;
        Ok(document_id)
    }

    /// Replace a registered document with a new chunk batch and labels.
    ///
    /// Chunks already handed out keep their old labels, but their snapshot is
    /// retired, so they no longer match filters.
    pub async fn reingest(&self, document_id: DocumentId, request: IngestRequest) -> Result<()> {
        if !self.store.contains(&document_id).await {
            return Err(Error::NotFound(document_id));
        }
        self.pipeline.add_documents(document_id, request).await?;
        info!(document_id = %document_id, "re-ingested document");
        Ok(())
    }

    /// Run one query for a precomputed embedding.
    ///
    /// The similarity search is raced against `cancel` and the search
    /// timeout. Cancellation yields [`QueryOutcome::Cancelled`], never an error.
    pub async fn query(
        &self,
        embedding: &[f32],
        settings: &QuerySettings,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome> {
        settings.validate()?;

        let k_fetch = plan_fetch_width(settings);
        debug!(
            k_fetch,
            max_chunks = settings.max_chunks,
            filtered = settings.has_filters(),
            "planned fetch width"
        );

        let search = tokio::time::timeout(self.search_timeout, self.index.search(embedding, k_fetch));

        let candidates = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("query cancelled during search");
                return Ok(QueryOutcome::Cancelled);
            }
            result = search => match result {
                Ok(Ok(candidates)) => candidates,
                Ok(Err(e)) => return Err(Error::RetrievalFailed(e)),
                Err(_) => {
                    return Err(Error::RetrievalFailed(IndexError::Timeout(self.search_timeout)))
                }
            },
        };

        let fetched = candidates.len();
        let outcome = rank_with_cancel(candidates, settings, cancel);

        match &outcome {
            QueryOutcome::Ranked(results) => {
                debug!(k_fetch, fetched, returned = results.len(), "query ranked")
            }
            QueryOutcome::Cancelled => debug!("query cancelled during ranking"),
        }

        Ok(outcome)
    }

    /// Embed `text` with the configured model, then [`query`](Self::query)
    pub async fn query_text(
        &self,
        text: &str,
        settings: &QuerySettings,
        cancel: &CancellationToken,
    ) -> Result<QueryOutcome> {
        settings.validate()?;

        let mut vectors = self
            .embedder
            .embed(&[text])
            .await
            .map_err(|e| Error::Embedding(format!("{:#}", e)))?;
        let embedding = vectors
            .pop()
            .ok_or_else(|| Error::Embedding("no embedding returned for query".to_string()))?;

        self.query(&embedding, settings, cancel).await
    }

    /// Registered entry for one document
    pub async fn document(&self, document_id: &DocumentId) -> Option<DocumentEntry> {
        self.store.get(document_id).await
    }

    /// All registered documents, ordered by filename
    pub async fn list_documents(&self) -> Vec<(DocumentId, DocumentEntry)> {
        self.store.list().await
    }

    pub async fn stats(&self) -> EngineStats {
        EngineStats {
            documents: self.store.len().await,
            chunks: self.store.chunk_count().await,
            indexed_vectors: self.index.len().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryIndex;
    use crate::embedding::HashedEmbedding;

    fn engine() -> RetrievalEngine {
        RetrievalEngine::new(
            Arc::new(MemoryIndex::new(256)),
            Arc::new(HashedEmbedding::new(256).unwrap()),
        )
    }

    fn doc(name: &str, text: &str) -> IngestRequest {
        IngestRequest::new(name, vec![text.to_string()])
    }

    #[tokio::test]
    async fn test_ingest_is_not_deduplicated() {
        let engine = engine();
        let a = engine.ingest(doc("a.txt", "same words")).await.unwrap();
        let b = engine.ingest(doc("a.txt", "same words")).await.unwrap();

        assert_ne!(a, b);
        let stats = engine.stats().await;
        assert_eq!(stats.documents, 2);
        assert_eq!(stats.chunks, 2);
        assert_eq!(stats.indexed_vectors, 2);
    }

    #[tokio::test]
    async fn test_reingest_replaces_entry() {
        let engine = engine();
        let id = engine
            .ingest(doc("a.txt", "first").with_tags(["old"]))
            .await
            .unwrap();

        engine
            .reingest(id, doc("a.txt", "second").with_tags(["new"]))
            .await
            .unwrap();

        let entry = engine.document(&id).await.unwrap();
        assert!(entry.tags.contains("new"));
        assert!(!entry.tags.contains("old"));
        assert_eq!(engine.stats().await.indexed_vectors, 1);
    }

    #[tokio::test]
    async fn test_reingest_unknown_id() {
        let engine = engine();
        let id = DocumentId::new();
        let err = engine.reingest(id, doc("a.txt", "text")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound(missing) if missing == id));
    }

    #[tokio::test]
    async fn test_query_text_finds_matching_document() {
        let engine = engine();
        engine
            .ingest(doc("rust.txt", "rust ownership and borrowing rules"))
            .await
            .unwrap();
        engine
            .ingest(doc("cake.txt", "flour sugar butter eggs"))
            .await
            .unwrap();

        let outcome = engine
            .query_text(
                "ownership borrowing",
                &QuerySettings::new(1, 0.0),
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let results = outcome.into_results().unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.snapshot.filename, "rust.txt");
    }

    #[tokio::test]
    async fn test_query_rejects_invalid_settings() {
        let engine = engine();
        let err = engine
            .query(&[0.0; 256], &QuerySettings::new(0, 0.0), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_query_already_cancelled() {
        let engine = engine();
        engine.ingest(doc("a.txt", "some text")).await.unwrap();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = engine
            .query_text("some text", &QuerySettings::default(), &cancel)
            .await
            .unwrap();
        assert!(outcome.is_cancelled());
    }
}

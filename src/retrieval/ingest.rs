//! Ingestion pipeline - stamp chunks, hand vectors to the index, register the document
//!
//! Order of work for one call: validate, stamp, embed, upsert, register.
//! The MetadataStore entry is written last, so a failure anywhere before it
//! leaves no entry behind.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::backend::{IndexEntry, VectorIndexClient};
use crate::embedding::EmbeddingModel;
use crate::error::{Error, Result};

use super::store::MetadataStore;
use super::types::{
    metadata_from_json, Chunk, ChunkId, ChunkSnapshot, DocumentEntry, DocumentId, IngestRequest,
};

pub struct IngestionPipeline {
    store: Arc<MetadataStore>,
    index: Arc<dyn VectorIndexClient>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl IngestionPipeline {
    pub fn new(
        store: Arc<MetadataStore>,
        index: Arc<dyn VectorIndexClient>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
        }
    }

    /// Ingest one document's chunk batch under `document_id`.
    ///
    /// An existing entry for the same id is fully replaced and its snapshot
    /// retired. Callers must serialize concurrent mutations of one id.
    pub async fn add_documents(
        &self,
        document_id: DocumentId,
        request: IngestRequest,
    ) -> Result<Vec<Arc<Chunk>>> {
        let (chunks, entry) = stamp_chunks(document_id, &request)?;

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let vectors = self
            .embedder
            .embed(&texts)
            .await
            .map_err(|e| Error::Embedding(format!("{:#}", e)))?;

        if vectors.len() != chunks.len() {
            return Err(Error::Embedding(format!(
                "expected {} embeddings, got {}",
                chunks.len(),
                vectors.len()
            )));
        }

        let entries: Vec<IndexEntry> = chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry {
                chunk: chunk.clone(),
                vector,
            })
            .collect();

        self.index
            .upsert(entries)
            .await
            .map_err(Error::IndexWrite)?;

        if let Some(previous) = self.store.put(document_id, entry).await {
            // Stale chunks left in the index by the previous batch stop matching filters
            previous.snapshot.retire();
        }

        info!(
            document_id = %document_id,
            filename = %request.filename,
            chunk_count = chunks.len(),
            "ingested document"
        );

        Ok(chunks)
    }
}

/// Validate a request and build its chunks plus the registry entry.
///
/// The combined snapshot is built once and shared by every chunk, so all
/// chunks of one call carry identical metadata.
pub fn stamp_chunks(
    document_id: DocumentId,
    request: &IngestRequest,
) -> Result<(Vec<Arc<Chunk>>, DocumentEntry)> {
    if request.chunk_texts.is_empty() {
        return Err(Error::Validation(format!(
            "no chunks to ingest for '{}'",
            request.filename
        )));
    }

    let metadata = metadata_from_json(&request.metadata)?;
    let custom = metadata_from_json(&request.custom)?;

    let mut stamped = metadata.clone();
    for (key, value) in custom {
        if stamped.contains_key(&key) {
            warn!(key = %key, "custom field shadows document metadata, keeping document value");
            continue;
        }
        stamped.insert(key, value);
    }

    let snapshot = Arc::new(ChunkSnapshot::new(
        document_id,
        request.filename.clone(),
        request.tags.clone(),
        stamped,
    ));

    let chunks: Vec<Arc<Chunk>> = request
        .chunk_texts
        .iter()
        .enumerate()
        .map(|(index, text)| {
            Arc::new(Chunk {
                id: ChunkId::new(document_id, index),
                document_id,
                index,
                text: text.clone(),
                snapshot: Arc::clone(&snapshot),
            })
        })
        .collect();

    debug!(document_id = %document_id, chunk_count = chunks.len(), "stamped chunks");

    let entry = DocumentEntry {
        filename: request.filename.clone(),
        tags: request.tags.clone(),
        metadata,
        chunk_ids: chunks.iter().map(|c| c.id.clone()).collect(),
        snapshot,
    };

    Ok((chunks, entry))
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::backend::MemoryIndex;
    use crate::embedding::HashedEmbedding;
    use crate::retrieval::types::MetadataValue;

    struct FailingEmbedder;

    #[async_trait]
    impl EmbeddingModel for FailingEmbedder {
        fn dimensions(&self) -> usize {
            8
        }

        async fn embed(&self, _texts: &[&str]) -> anyhow::Result<Vec<Vec<f32>>> {
            anyhow::bail!("model offline")
        }
    }

    fn pipeline(store: Arc<MetadataStore>, index: Arc<MemoryIndex>) -> IngestionPipeline {
        IngestionPipeline::new(store, index, Arc::new(HashedEmbedding::new(8).unwrap()))
    }

    fn request() -> IngestRequest {
        IngestRequest::new(
            "paper.txt",
            vec!["first chunk".to_string(), "second chunk".to_string()],
        )
        .with_tags(["research", "ai"])
        .with_metadata("year", 2024)
        .with_metadata("author", "Test User")
    }

    #[test]
    fn test_stamp_shares_one_snapshot() {
        let id = DocumentId::new();
        let (chunks, entry) = stamp_chunks(id, &request()).unwrap();

        assert_eq!(chunks.len(), 2);
        assert!(Arc::ptr_eq(&chunks[0].snapshot, &chunks[1].snapshot));
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[0].document_id, id);
        assert_eq!(chunks[0].snapshot.filename, "paper.txt");
        assert_eq!(entry.chunk_ids, vec![ChunkId::new(id, 0), ChunkId::new(id, 1)]);
        assert!(Arc::ptr_eq(&entry.snapshot, &chunks[0].snapshot));
    }

    #[test]
    fn test_stamp_merges_custom_fields() {
        let req = request()
            .with_custom("source", "upload")
            .with_custom("year", "ignored");
        let (chunks, entry) = stamp_chunks(DocumentId::new(), &req).unwrap();

        let stamped = &chunks[0].snapshot.metadata;
        assert_eq!(stamped["source"], MetadataValue::from("upload"));
        assert_eq!(stamped["year"], MetadataValue::from(2024));
        // Custom fields are not registered as document metadata
        assert!(!entry.metadata.contains_key("source"));
    }

    #[test]
    fn test_stamp_rejects_empty_batch() {
        let req = IngestRequest::new("empty.txt", Vec::new());
        assert!(matches!(
            stamp_chunks(DocumentId::new(), &req),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_stamp_rejects_nested_metadata() {
        let req = request().with_metadata("refs", json!(["a", "b"]));
        assert!(matches!(
            stamp_chunks(DocumentId::new(), &req),
            Err(Error::Validation(_))
        ));

        let req = request().with_custom("nested", json!({"k": 1}));
        assert!(stamp_chunks(DocumentId::new(), &req).is_err());
    }

    #[tokio::test]
    async fn test_add_documents_registers_and_indexes() {
        let store = Arc::new(MetadataStore::new());
        let index = Arc::new(MemoryIndex::new(8));
        let pipeline = pipeline(store.clone(), index.clone());

        let id = DocumentId::new();
        let chunks = pipeline.add_documents(id, request()).await.unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(index.len().await, 2);
        let entry = store.get(&id).await.unwrap();
        assert!(entry.tags.contains("research"));
        assert_eq!(entry.chunk_count(), 2);
    }

    #[tokio::test]
    async fn test_replacing_entry_retires_previous_snapshot() {
        let store = Arc::new(MetadataStore::new());
        let index = Arc::new(MemoryIndex::new(8));
        let pipeline = pipeline(store.clone(), index);

        let id = DocumentId::new();
        let first = pipeline.add_documents(id, request()).await.unwrap();
        assert!(!first[0].snapshot.is_retired());

        let second = pipeline
            .add_documents(id, IngestRequest::new("paper.txt", vec!["only chunk".to_string()]))
            .await
            .unwrap();

        assert!(first[1].snapshot.is_retired());
        assert!(first[1].snapshot.tags.contains("research"));
        assert!(!second[0].snapshot.is_retired());
    }

    #[tokio::test]
    async fn test_failed_embedding_leaves_no_entry() {
        let store = Arc::new(MetadataStore::new());
        let index = Arc::new(MemoryIndex::new(8));
        let pipeline = IngestionPipeline::new(store.clone(), index.clone(), Arc::new(FailingEmbedder));

        let id = DocumentId::new();
        let err = pipeline.add_documents(id, request()).await.unwrap_err();

        assert!(matches!(err, Error::Embedding(_)));
        assert!(err.to_string().contains("model offline"));
        assert!(store.get(&id).await.is_none());
        assert!(index.is_empty().await);
    }

    #[tokio::test]
    async fn test_failed_upsert_leaves_no_entry() {
        let store = Arc::new(MetadataStore::new());
        // Index expects a different dimensionality than the embedder produces
        let index = Arc::new(MemoryIndex::new(16));
        let pipeline = pipeline(store.clone(), index);

        let id = DocumentId::new();
        let err = pipeline.add_documents(id, request()).await.unwrap_err();

        assert!(matches!(err, Error::IndexWrite(_)));
        assert!(store.is_empty().await);
    }
}

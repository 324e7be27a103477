//! Metadata store - authoritative document tags and metadata
//!
//! Read and written only by the ingestion and deletion paths. Query-time
//! filtering works on the immutable chunk snapshots instead, so queries never
//! wait on this lock.

use rustc_hash::FxHashMap;
use tokio::sync::RwLock;

use super::types::{DocumentEntry, DocumentId, Metadata, TagSet};

/// Keyed registry: document id -> (tags, metadata, owned chunk ids)
#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: RwLock<FxHashMap<DocumentId, DocumentEntry>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace the entry for `id`, returning the replaced one.
    /// No merge with a prior entry.
    pub async fn put(&self, id: DocumentId, entry: DocumentEntry) -> Option<DocumentEntry> {
        self.entries.write().await.insert(id, entry)
    }

    /// Look up an entry; a missing id is `None`, never an error.
    pub async fn get(&self, id: &DocumentId) -> Option<DocumentEntry> {
        self.entries.read().await.get(id).cloned()
    }

    /// Tags and metadata only
    pub async fn labels(&self, id: &DocumentId) -> Option<(TagSet, Metadata)> {
        self.entries
            .read()
            .await
            .get(id)
            .map(|e| (e.tags.clone(), e.metadata.clone()))
    }

    pub async fn contains(&self, id: &DocumentId) -> bool {
        self.entries.read().await.contains_key(id)
    }

    /// Remove the entry, returning it if it existed
    pub async fn delete(&self, id: &DocumentId) -> Option<DocumentEntry> {
        self.entries.write().await.remove(id)
    }

    /// Remove and return every entry
    pub async fn drain(&self) -> Vec<(DocumentId, DocumentEntry)> {
        self.entries.write().await.drain().collect()
    }

    /// Snapshot of all entries, ordered by filename then id
    pub async fn list(&self) -> Vec<(DocumentId, DocumentEntry)> {
        let mut all: Vec<(DocumentId, DocumentEntry)> = self
            .entries
            .read()
            .await
            .iter()
            .map(|(id, entry)| (*id, entry.clone()))
            .collect();
        all.sort_by(|a, b| a.1.filename.cmp(&b.1.filename).then(a.0.cmp(&b.0)));
        all
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Total chunks across all registered documents
    pub async fn chunk_count(&self) -> usize {
        self.entries
            .read()
            .await
            .values()
            .map(DocumentEntry::chunk_count)
            .sum()
    }
}

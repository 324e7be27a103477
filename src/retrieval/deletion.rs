//! Deletion path
//!
//! Removes MetadataStore entries and retires the shared chunk snapshot.
//! Vectors stay in the external index until its owner calls
//! `remove_document`, so unfiltered queries can still surface a deleted
//! document's chunks; any tag or metadata filter rejects them.

use tracing::info;

use super::engine::RetrievalEngine;
use super::types::DocumentId;

impl RetrievalEngine {
    /// Remove a document's registry entry and retire its chunks.
    ///
    /// Returns whether an entry was removed. An unknown id is logged and
    /// treated as a no-op.
    pub async fn delete_document(&self, document_id: &DocumentId) -> bool {
        match self.store.delete(document_id).await {
            Some(entry) => {
                entry.snapshot.retire();
                info!(
                    document_id = %document_id,
                    filename = %entry.filename,
                    chunk_count = entry.chunk_count(),
                    "deleted document"
                );
                true
            }
            None => {
                info!(document_id = %document_id, "document not found, nothing to delete");
                false
            }
        }
    }

    /// Remove every registry entry, returning how many were removed
    pub async fn delete_all(&self) -> usize {
        let drained = self.store.drain().await;
        for (_, entry) in &drained {
            entry.snapshot.retire();
        }
        info!(removed = drained.len(), "deleted all documents");
        drained.len()
    }
}

//! Chunking module - turn source files into ordered chunk texts

mod loader;
mod simple;

pub use loader::{sidecar_path, DocumentLoader, LoadedDocument, DEFAULT_FILE_TYPES, SIDECAR_SUFFIX};
pub use simple::SimpleChunker;

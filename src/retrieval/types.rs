//! Documents, chunks and the scalar metadata model

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Unordered, duplicate-free set of tags
pub type TagSet = BTreeSet<String>;

/// Key to scalar metadata map
pub type Metadata = BTreeMap<String, MetadataValue>;

/// Document identifier, assigned at ingestion and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Allocate a fresh random identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for DocumentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| Error::Validation(format!("invalid document id '{}': {}", s, e)))
    }
}

/// Chunk identifier: owning document plus position within it
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChunkId(String);

impl ChunkId {
    pub fn new(document_id: DocumentId, index: usize) -> Self {
        Self(format!("{}#{}", document_id, index))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Scalar metadata value.
///
/// Equality is type-strict: `Number(2024.0)` never equals `String("2024")`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    String(String),
    Number(f64),
    Bool(bool),
}

impl MetadataValue {
    /// Name of the scalar type, used in log and error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            MetadataValue::String(_) => "string",
            MetadataValue::Number(_) => "number",
            MetadataValue::Bool(_) => "bool",
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetadataValue::String(s) => write!(f, "\"{}\"", s),
            MetadataValue::Number(n) => write!(f, "{}", n),
            MetadataValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for MetadataValue {
    fn from(s: &str) -> Self {
        MetadataValue::String(s.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(s: String) -> Self {
        MetadataValue::String(s)
    }
}

impl From<f64> for MetadataValue {
    fn from(n: f64) -> Self {
        MetadataValue::Number(n)
    }
}

impl From<i64> for MetadataValue {
    fn from(n: i64) -> Self {
        MetadataValue::Number(n as f64)
    }
}

impl From<i32> for MetadataValue {
    fn from(n: i32) -> Self {
        MetadataValue::Number(f64::from(n))
    }
}

impl From<bool> for MetadataValue {
    fn from(b: bool) -> Self {
        MetadataValue::Bool(b)
    }
}

impl TryFrom<&Value> for MetadataValue {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(MetadataValue::String(s.clone())),
            Value::Bool(b) => Ok(MetadataValue::Bool(*b)),
            Value::Number(n) => n
                .as_f64()
                .map(MetadataValue::Number)
                .ok_or_else(|| Error::Validation(format!("number {} is not representable", n))),
            Value::Null => Err(Error::Validation("metadata value is null".to_string())),
            Value::Array(_) => Err(Error::Validation(
                "metadata value is an array; only string, number or bool are allowed".to_string(),
            )),
            Value::Object(_) => Err(Error::Validation(
                "metadata value is an object; only string, number or bool are allowed".to_string(),
            )),
        }
    }
}

/// Convert a loosely typed JSON map into scalar metadata.
///
/// Any non-scalar value rejects the whole map.
pub fn metadata_from_json(map: &serde_json::Map<String, Value>) -> Result<Metadata> {
    map.iter()
        .map(|(key, value)| {
            MetadataValue::try_from(value)
                .map(|v| (key.clone(), v))
                .map_err(|e| match e {
                    Error::Validation(msg) => Error::Validation(format!("key '{}': {}", key, msg)),
                    other => other,
                })
        })
        .collect()
}

/// Denormalized copy of the owning document's tags and metadata, taken once
/// at ingestion and never updated afterwards.
///
/// The only mutable part is the retired flag, set when the document is
/// deleted or re-ingested. Retired snapshots fail every non-empty filter.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChunkSnapshot {
    pub document_id: DocumentId,
    pub filename: String,
    pub tags: TagSet,
    pub metadata: Metadata,
    #[serde(skip)]
    retired: AtomicBool,
}

impl ChunkSnapshot {
    pub fn new(
        document_id: DocumentId,
        filename: impl Into<String>,
        tags: TagSet,
        metadata: Metadata,
    ) -> Self {
        Self {
            document_id,
            filename: filename.into(),
            tags,
            metadata,
            retired: AtomicBool::new(false),
        }
    }

    /// Whether the owning document was deleted or re-ingested since stamping
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    pub(crate) fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }
}

impl Clone for ChunkSnapshot {
    fn clone(&self) -> Self {
        Self {
            document_id: self.document_id,
            filename: self.filename.clone(),
            tags: self.tags.clone(),
            metadata: self.metadata.clone(),
            retired: AtomicBool::new(self.is_retired()),
        }
    }
}

/// Compares labels only
impl PartialEq for ChunkSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.document_id == other.document_id
            && self.filename == other.filename
            && self.tags == other.tags
            && self.metadata == other.metadata
    }
}

/// A unit of retrievable text
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub id: ChunkId,
    /// Back-reference to the owning document
    pub document_id: DocumentId,
    /// Position within the owning document
    pub index: usize,
    pub text: String,
    /// Shared by every chunk of one ingestion call
    pub snapshot: Arc<ChunkSnapshot>,
}

/// Candidate returned by the similarity index, before filtering
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub chunk: Arc<Chunk>,
    pub score: f32,
}

/// Ranked query result element
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: Arc<Chunk>,
    pub score: f32,
    pub tags: TagSet,
    pub metadata: Metadata,
}

/// Authoritative, mutable registry entry for one document
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentEntry {
    pub filename: String,
    pub tags: TagSet,
    pub metadata: Metadata,
    pub chunk_ids: Vec<ChunkId>,
    /// Snapshot shared by this document's chunks, retired when the entry goes
    pub snapshot: Arc<ChunkSnapshot>,
}

impl DocumentEntry {
    pub fn chunk_count(&self) -> usize {
        self.chunk_ids.len()
    }
}

/// One ingestion call: the chunk texts of a single document plus its labels.
///
/// Metadata arrives loosely typed from the request layer and is validated
/// into scalars during ingestion.
#[derive(Debug, Clone, Default)]
pub struct IngestRequest {
    pub filename: String,
    pub chunk_texts: Vec<String>,
    pub tags: TagSet,
    pub metadata: serde_json::Map<String, Value>,
    /// Extra fields stamped on the chunks but not registered as document metadata
    pub custom: serde_json::Map<String, Value>,
}

impl IngestRequest {
    pub fn new(filename: impl Into<String>, chunk_texts: Vec<String>) -> Self {
        Self {
            filename: filename.into(),
            chunk_texts,
            ..Default::default()
        }
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn with_custom(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.custom.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_value_equality_is_type_strict() {
        assert_ne!(MetadataValue::from(2024), MetadataValue::from("2024"));
        assert_eq!(MetadataValue::from(2024), MetadataValue::Number(2024.0));
        assert_ne!(MetadataValue::from(true), MetadataValue::from("true"));
    }

    #[test]
    fn test_metadata_from_json_accepts_scalars() {
        let map = json!({"author": "Test User", "year": 2024, "draft": false});
        let metadata = metadata_from_json(map.as_object().unwrap()).unwrap();

        assert_eq!(metadata["author"], MetadataValue::from("Test User"));
        assert_eq!(metadata["year"], MetadataValue::Number(2024.0));
        assert_eq!(metadata["draft"], MetadataValue::Bool(false));
    }

    #[test]
    fn test_metadata_from_json_rejects_nested() {
        let map = json!({"author": "x", "refs": ["a", "b"]});
        let err = metadata_from_json(map.as_object().unwrap()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("refs"));

        let map = json!({"owner": {"name": "x"}});
        assert!(metadata_from_json(map.as_object().unwrap()).is_err());

        let map = json!({"missing": null});
        assert!(metadata_from_json(map.as_object().unwrap()).is_err());
    }

    #[test]
    fn test_untagged_deserialize() {
        let metadata: Metadata =
            serde_json::from_str(r#"{"year": 2024, "label": "2024", "ok": true}"#).unwrap();
        assert_eq!(metadata["year"], MetadataValue::Number(2024.0));
        assert_eq!(metadata["label"], MetadataValue::String("2024".to_string()));
        assert_eq!(metadata["ok"], MetadataValue::Bool(true));
    }

    #[test]
    fn test_document_id_roundtrip_and_uniqueness() {
        let a = DocumentId::new();
        let b = DocumentId::new();
        assert_ne!(a, b);

        let parsed: DocumentId = a.to_string().parse().unwrap();
        assert_eq!(parsed, a);
        assert!("not-a-uuid".parse::<DocumentId>().is_err());
    }

    #[test]
    fn test_retired_flag_is_shared_and_labels_unchanged() {
        let snapshot = Arc::new(ChunkSnapshot::new(
            DocumentId::new(),
            "a.txt",
            ["research".to_string()].into_iter().collect(),
            Metadata::new(),
        ));
        let held = Arc::clone(&snapshot);
        assert!(!held.is_retired());

        snapshot.retire();

        assert!(held.is_retired());
        assert!(held.tags.contains("research"));
        assert_eq!(*held, ChunkSnapshot::new(held.document_id, "a.txt", held.tags.clone(), Metadata::new()));
    }

    #[test]
    fn test_chunk_id_format() {
        let doc = DocumentId::new();
        let id = ChunkId::new(doc, 3);
        assert_eq!(id.as_str(), format!("{}#3", doc));
    }
}

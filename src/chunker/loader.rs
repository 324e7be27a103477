//! Document loading - walk paths, read files, split them into chunk texts

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ignore::WalkBuilder;
use serde::Deserialize;
use tracing::{debug, warn};

use super::SimpleChunker;
use crate::error::Result;
use crate::retrieval::IngestRequest;

/// Suffix of the optional per-document label file
pub const SIDECAR_SUFFIX: &str = ".meta.json";

/// Extensions loaded when none are configured
pub const DEFAULT_FILE_TYPES: &[&str] = &[
    ".txt", ".md", ".rst", ".py", ".js", ".ts", ".tsx", ".jsx", ".rs", ".go", ".java", ".c",
    ".cpp", ".cc", ".h", ".hpp", ".json", ".yaml", ".yml", ".toml", ".rb", ".php", ".swift",
    ".kt", ".scala", ".cs", ".html", ".csv",
];

/// Tags and metadata read from `<file>.meta.json`
#[derive(Debug, Default, Deserialize)]
struct Sidecar {
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    metadata: serde_json::Map<String, serde_json::Value>,
}

/// One file split into chunk texts, with its labels
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub path: PathBuf,
    pub chunks: Vec<String>,
    pub tags: BTreeSet<String>,
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LoadedDocument {
    /// Turn into an ingestion request named after the file.
    ///
    /// The source path is stamped on the chunks as the `source` field.
    pub fn into_request(self) -> IngestRequest {
        let filename = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned());

        let mut request = IngestRequest::new(filename, self.chunks)
            .with_custom("source", self.path.to_string_lossy().into_owned());
        request.tags = self.tags;
        request.metadata = self.metadata;
        request
    }
}

/// Raw files to ordered chunk texts
#[derive(Debug, Clone)]
pub struct DocumentLoader {
    chunker: SimpleChunker,
    file_types: Vec<String>,
    max_file_size: u64,
    include_hidden: bool,
}

impl DocumentLoader {
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunker: SimpleChunker::new(chunk_size, chunk_overlap),
            file_types: DEFAULT_FILE_TYPES.iter().map(|s| s.to_string()).collect(),
            max_file_size: 1024 * 1024,
            include_hidden: false,
        }
    }

    /// Restrict loading to these extensions (with or without the leading dot)
    pub fn with_file_types<I, S>(mut self, file_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.file_types = file_types
            .into_iter()
            .map(|t| {
                let t = t.as_ref().trim().to_lowercase();
                if t.starts_with('.') {
                    t
                } else {
                    format!(".{}", t)
                }
            })
            .filter(|t| t.len() > 1)
            .collect();
        self
    }

    pub fn with_max_file_size_kb(mut self, kb: usize) -> Self {
        self.max_file_size = kb as u64 * 1024;
        self
    }

    pub fn with_hidden(mut self, include_hidden: bool) -> Self {
        self.include_hidden = include_hidden;
        self
    }

    /// Whether `path` has an allowed extension and is not a sidecar
    pub fn accepts(&self, path: &Path) -> bool {
        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().to_lowercase(),
            None => return false,
        };
        if name.ends_with(SIDECAR_SUFFIX) {
            return false;
        }
        match path.extension() {
            Some(ext) => {
                let ext = format!(".{}", ext.to_string_lossy().to_lowercase());
                self.file_types.iter().any(|t| *t == ext)
            }
            None => false,
        }
    }

    /// Expand files and directories into the files to load, sorted and deduplicated.
    /// Directories are walked with gitignore support.
    pub fn discover(&self, paths: &[PathBuf]) -> Vec<PathBuf> {
        let mut files = BTreeSet::new();

        for path in paths {
            if path.is_file() {
                if self.accepts(path) {
                    files.insert(path.clone());
                }
            } else if path.is_dir() {
                let walker = WalkBuilder::new(path)
                    .hidden(!self.include_hidden)
                    .git_ignore(true)
                    .git_global(true)
                    .build();

                for entry in walker.flatten() {
                    let entry_path = entry.path();
                    if entry_path.is_file() && self.accepts(entry_path) {
                        files.insert(entry_path.to_path_buf());
                    }
                }
            } else {
                warn!("Path not found: {}", path.display());
            }
        }

        files.into_iter().collect()
    }

    /// Load one file. Returns `None` for files that are skipped: too large,
    /// not valid UTF-8 or without any text.
    pub fn load_file(&self, path: &Path) -> Result<Option<LoadedDocument>> {
        let size = std::fs::metadata(path)?.len();
        if size > self.max_file_size {
            warn!(
                "Skipping {} ({} KB exceeds limit of {} KB)",
                path.display(),
                size / 1024,
                self.max_file_size / 1024
            );
            return Ok(None);
        }

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                warn!("Skipping {}: not valid UTF-8", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        let chunks = self.chunker.chunk(&content);
        if chunks.is_empty() {
            debug!("Skipping {}: no text", path.display());
            return Ok(None);
        }

        let sidecar = read_sidecar(path)?;
        debug!("Loaded {} ({} chunks)", path.display(), chunks.len());

        Ok(Some(LoadedDocument {
            path: path.to_path_buf(),
            chunks,
            tags: sidecar
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
            metadata: sidecar.metadata,
        }))
    }

    /// Discover and load every file under `paths`
    pub fn load(&self, paths: &[PathBuf]) -> Result<Vec<LoadedDocument>> {
        let mut documents = Vec::new();
        for path in self.discover(paths) {
            if let Some(doc) = self.load_file(&path)? {
                documents.push(doc);
            }
        }
        Ok(documents)
    }
}

/// Path of the sidecar label file for `path`
pub fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

fn read_sidecar(path: &Path) -> Result<Sidecar> {
    let sidecar = sidecar_path(path);
    if !sidecar.exists() {
        return Ok(Sidecar::default());
    }
    let content = std::fs::read_to_string(&sidecar)?;
    let parsed = serde_json::from_str(&content)
        .inspect_err(|e| warn!("Invalid sidecar {}: {}", sidecar.display(), e))?;
    Ok(parsed)
}

//! Knowledge system type definitions.

use ragline_core::config::RetrievalConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Free-form chunk metadata (`source`, `chunk_id`, `chunk_type`, `doc_name`, ...).
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key holding a chunk's stable identity.
pub const CHUNK_ID_KEY: &str = "chunk_id";

/// A passage returned by retrieval, before or after reranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDocument {
    /// Passage text
    pub content: String,

    /// Origin metadata; never empty once it has passed retrieval
    pub metadata: Metadata,

    /// Lexical relevance score, set by the reranker
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

impl CandidateDocument {
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            content: content.into(),
            metadata,
            score: None,
        }
    }

    /// The `chunk_id` metadata entry, if present and non-empty.
    pub fn chunk_id(&self) -> Option<&str> {
        self.metadata
            .get(CHUNK_ID_KEY)
            .and_then(|v| v.as_str())
            .filter(|id| !id.is_empty())
    }

    /// The `source` metadata entry, or `"unknown"`.
    pub fn source(&self) -> &str {
        self.metadata
            .get("source")
            .and_then(|v| v.as_str())
            .unwrap_or("unknown")
    }
}

/// Metadata used when a store returns a passage without any.
pub fn unknown_source_metadata() -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), "unknown".into());
    metadata
}

/// Options for ingesting files into the persistent corpus.
#[derive(Debug, Clone)]
pub struct LearnOptions {
    /// Files or directories to ingest
    pub paths: Vec<PathBuf>,

    /// Clear the corpus before ingesting
    pub reset: bool,

    /// Chunk size in characters
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,

    /// Chunks per `VectorStore::add` call
    pub batch_size: usize,

    /// File extensions to ingest (lowercase, without dot)
    pub extensions: Vec<String>,
}

impl LearnOptions {
    pub fn new(paths: Vec<PathBuf>, retrieval: &RetrievalConfig) -> Self {
        Self {
            paths,
            reset: false,
            chunk_size: retrieval.corpus_chunk_size,
            chunk_overlap: retrieval.corpus_chunk_overlap,
            batch_size: retrieval.ingest_batch_size.max(1),
            extensions: vec!["txt".to_string(), "md".to_string()],
        }
    }

    pub fn with_reset(mut self, reset: bool) -> Self {
        self.reset = reset;
        self
    }
}

/// Statistics from an ingestion run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LearnStats {
    /// Files ingested
    pub sources_count: u32,

    /// Chunks added to the corpus
    pub chunks_count: u32,

    /// Files skipped (unreadable, empty or unsupported)
    pub skipped_count: u32,

    /// Total bytes read
    pub bytes_processed: u64,

    /// Wall-clock duration
    pub duration_secs: f64,
}

/// Whether the persistent corpus holds anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorpusState {
    Active,
    Empty,
}

/// Summary of the persistent corpus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusStatus {
    pub collection_name: String,
    pub document_count: usize,
    pub location: String,
    pub status: CorpusState,
    pub embedding_provider: String,
    pub embedding_model: String,
}

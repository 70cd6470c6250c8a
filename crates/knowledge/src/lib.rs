//! Knowledge and question answering for Ragline.
//!
//! Provides the persistent corpus (SQLite plus embeddings), ingestion of
//! local files, and the adaptive question-answering pipeline in [`rag`].

pub mod chunker;
pub mod embeddings;
pub mod ingest;
pub mod rag;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

// Re-export commonly used types
pub use embeddings::{create_provider, EmbeddingProvider};
pub use ingest::{learn, status};
pub use rag::{AttachedDocument, Engine, QaResponse};
pub use store::{MemoryStore, QueryResult, SqliteStore, VectorStore};
pub use types::{
    CandidateDocument, CorpusState, CorpusStatus, LearnOptions, LearnStats, Metadata,
};

use ragline_core::config::AppConfig;
use ragline_core::AppResult;
use ragline_llm::{RetryPolicy, Throttle};
use std::sync::Arc;

/// Open the persistent corpus and its embedder from configuration.
pub fn open_corpus(config: &AppConfig) -> AppResult<(SqliteStore, Arc<dyn EmbeddingProvider>)> {
    config.ensure_data_dir()?;

    let throttle = Arc::new(Throttle::new(RetryPolicy::from(&config.rate_limit)));
    let embedder = create_provider(&config.embedding, throttle)?;
    let store = SqliteStore::open(
        &config.corpus_path(),
        rag::CORPUS_COLLECTION,
        embedder.clone(),
    )?;

    Ok((store, embedder))
}

//! Retrieval over the persistent corpus and the per-run attached document.

use super::types::AttachedDocument;
use crate::chunker::chunk_text;
use crate::embeddings::EmbeddingProvider;
use crate::store::{MemoryStore, VectorStore};
use crate::types::{unknown_source_metadata, CandidateDocument, Metadata, CHUNK_ID_KEY};
use ragline_core::config::RetrievalConfig;
use ragline_core::AppResult;
use std::sync::Arc;

/// A store queried during retrieval, with its per-query result count.
#[derive(Clone)]
pub struct RetrievalSource {
    pub store: Arc<dyn VectorStore>,
    pub n_results: usize,
}

impl RetrievalSource {
    pub fn new(store: Arc<dyn VectorStore>, n_results: usize) -> Self {
        Self { store, n_results }
    }

    /// Run every query against this store and concatenate the results.
    ///
    /// A failing query is logged and skipped.
    pub async fn query_all(&self, queries: &[String]) -> Vec<CandidateDocument> {
        let mut candidates = Vec::new();

        for query in queries.iter().filter(|q| !q.trim().is_empty()) {
            match self.store.query(query, self.n_results).await {
                Ok(result) => {
                    for ((text, metadata), distance) in result
                        .documents
                        .into_iter()
                        .zip(result.metadatas)
                        .zip(result.distances)
                    {
                        if text.trim().is_empty() {
                            continue;
                        }
                        let metadata = metadata
                            .filter(|m| !m.is_empty())
                            .unwrap_or_else(unknown_source_metadata);
                        let mut candidate = CandidateDocument::new(text, metadata);
                        candidate.score = Some(distance);
                        candidates.push(candidate);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        store = self.store.name(),
                        "Retrieval query failed, skipping: {}",
                        e
                    );
                }
            }
        }

        tracing::debug!(
            store = self.store.name(),
            queries = queries.len(),
            "Retrieved {} candidates",
            candidates.len()
        );
        candidates
    }
}

/// Query every source with every query, in order.
pub async fn retrieve(sources: &[RetrievalSource], queries: &[String]) -> Vec<CandidateDocument> {
    let mut candidates = Vec::new();
    for source in sources {
        candidates.extend(source.query_all(queries).await);
    }
    candidates
}

/// Chunk an attached document into a fresh in-memory store.
///
/// Text past `max_document_chars` is ignored. Chunks get ids
/// `doc_chunk_<i>`.
pub async fn build_document_store(
    document: &AttachedDocument,
    embedder: Arc<dyn EmbeddingProvider>,
    config: &RetrievalConfig,
) -> AppResult<MemoryStore> {
    let text = super::relevancy::char_prefix(&document.text, config.max_document_chars);
    let chunks = chunk_text(
        text,
        config.document_chunk_size,
        config.document_chunk_overlap,
    )?;

    let store = MemoryStore::ephemeral(embedder);
    let ids: Vec<String> = (0..chunks.len()).map(|i| format!("doc_chunk_{}", i)).collect();
    let metadatas: Vec<Metadata> = ids.iter().map(|id| document_metadata(id)).collect();
    store.add(&ids, &chunks, &metadatas).await?;

    tracing::debug!(
        store = store.name(),
        document = %document.name,
        "Indexed attached document into {} chunks",
        chunks.len()
    );
    Ok(store)
}

fn document_metadata(chunk_id: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("source".to_string(), "attached_document".into());
    metadata.insert("chunk_type".to_string(), "document".into());
    metadata.insert(CHUNK_ID_KEY.to_string(), chunk_id.into());
    metadata
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::store::QueryResult;
    use ragline_core::AppError;

    struct BrokenStore;

    #[async_trait::async_trait]
    impl VectorStore for BrokenStore {
        fn name(&self) -> &str {
            "broken"
        }
        fn location(&self) -> String {
            "nowhere".to_string()
        }
        async fn add(&self, _: &[String], _: &[String], _: &[Metadata]) -> AppResult<()> {
            Err(AppError::Knowledge("read only".to_string()))
        }
        async fn query(&self, _: &str, _: usize) -> AppResult<QueryResult> {
            Err(AppError::Knowledge("offline".to_string()))
        }
        async fn count(&self) -> AppResult<usize> {
            Ok(0)
        }
        async fn reset(&self) -> AppResult<()> {
            Ok(())
        }
    }

    fn embedder() -> Arc<dyn EmbeddingProvider> {
        Arc::new(TrigramProvider::new(128))
    }

    #[tokio::test]
    async fn test_document_store_ids_and_metadata() {
        let document = AttachedDocument::new(
            "policy.txt",
            "Refunds are issued within 14 days. ".repeat(40),
        );
        let store = build_document_store(&document, embedder(), &RetrievalConfig::default())
            .await
            .unwrap();

        let count = store.count().await.unwrap();
        assert!(count > 1);

        let result = store.query("refunds", count).await.unwrap();
        for metadata in result.metadatas.iter().flatten() {
            assert_eq!(metadata["source"], "attached_document");
            assert_eq!(metadata["chunk_type"], "document");
            assert!(metadata[CHUNK_ID_KEY]
                .as_str()
                .unwrap()
                .starts_with("doc_chunk_"));
        }
    }

    #[tokio::test]
    async fn test_document_text_is_capped() {
        let config = RetrievalConfig {
            max_document_chars: 100,
            document_chunk_size: 50,
            document_chunk_overlap: 0,
            ..RetrievalConfig::default()
        };
        let document = AttachedDocument::new("long.txt", "word ".repeat(1000));
        let store = build_document_store(&document, embedder(), &config).await.unwrap();

        assert!(store.count().await.unwrap() <= 3);
    }

    #[tokio::test]
    async fn test_failing_source_does_not_block_others() {
        let good = Arc::new(MemoryStore::new("good", embedder()));
        good.add(
            &["a".to_string()],
            &["Passports renew online.".to_string()],
            &[Metadata::new()],
        )
        .await
        .unwrap();

        let sources = vec![
            RetrievalSource::new(Arc::new(BrokenStore), 15),
            RetrievalSource::new(good, 15),
        ];
        let queries = vec!["passport".to_string(), "  ".to_string(), "renew".to_string()];

        let candidates = retrieve(&sources, &queries).await;
        assert_eq!(candidates.len(), 2);
        assert!(candidates.iter().all(|c| c.source() == "unknown"));
    }

    #[tokio::test]
    async fn test_blank_passages_are_dropped() {
        let store = Arc::new(MemoryStore::new("mixed", embedder()));
        store
            .add(
                &["a".to_string(), "b".to_string()],
                &["   ".to_string(), "Real content here.".to_string()],
                &[Metadata::new(), Metadata::new()],
            )
            .await
            .unwrap();

        let candidates = RetrievalSource::new(store, 10)
            .query_all(&["content".to_string()])
            .await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].content, "Real content here.");
    }
}

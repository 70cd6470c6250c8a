//! In-memory store for per-request attached documents.

use super::{check_add_lengths, embed_passages, nearest, QueryResult, VectorStore};
use crate::embeddings::EmbeddingProvider;
use crate::types::Metadata;
use ragline_core::AppResult;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
struct Entry {
    text: String,
    metadata: Option<Metadata>,
    embedding: Vec<f32>,
}

/// Ephemeral store that lives for a single question. Nothing is written to disk.
#[derive(Debug)]
pub struct MemoryStore {
    name: String,
    entries: RwLock<Vec<(String, Entry)>>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>, embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            name: name.into(),
            entries: RwLock::new(Vec::new()),
            embedder,
        }
    }

    /// A store with a unique `attached_<uuid>` name.
    pub fn ephemeral(embedder: Arc<dyn EmbeddingProvider>) -> Self {
        Self::new(format!("attached_{}", uuid::Uuid::new_v4().simple()), embedder)
    }
}

#[async_trait::async_trait]
impl VectorStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> String {
        "memory".to_string()
    }

    async fn add(&self, ids: &[String], texts: &[String], metadatas: &[Metadata]) -> AppResult<()> {
        check_add_lengths(ids, texts, metadatas)?;
        if ids.is_empty() {
            return Ok(());
        }

        let embeddings = embed_passages(self.embedder.as_ref(), texts).await?;

        let mut entries = self.entries.write().await;
        for ((id, text), (metadata, embedding)) in ids
            .iter()
            .zip(texts)
            .zip(metadatas.iter().zip(embeddings))
        {
            let entry = Entry {
                text: text.clone(),
                metadata: (!metadata.is_empty()).then(|| metadata.clone()),
                embedding,
            };
            // Same id replaces in place, keeping insertion order.
            match entries.iter_mut().find(|(existing, _)| existing == id) {
                Some(slot) => slot.1 = entry,
                None => entries.push((id.clone(), entry)),
            }
        }

        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> AppResult<QueryResult> {
        let query_embedding = self.embedder.embed(text).await?;
        let entries = self.entries.read().await;

        let rows = entries.iter().map(|(_, entry)| {
            (
                entry.text.clone(),
                entry.metadata.clone(),
                entry.embedding.clone(),
            )
        });
        Ok(nearest(&query_embedding, rows, k))
    }

    async fn count(&self) -> AppResult<usize> {
        Ok(self.entries.read().await.len())
    }

    async fn reset(&self) -> AppResult<()> {
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::tests::support::LossyEmbedder;
    use ragline_core::AppError;

    fn store() -> MemoryStore {
        MemoryStore::ephemeral(Arc::new(TrigramProvider::new(128)))
    }

    #[tokio::test]
    async fn test_ephemeral_names_are_unique() {
        let a = store();
        let b = store();
        assert!(a.name().starts_with("attached_"));
        assert_ne!(a.name(), b.name());
        assert_eq!(a.location(), "memory");
    }

    #[tokio::test]
    async fn test_query_returns_closest_first() {
        let store = store();
        store
            .add(
                &["doc_chunk_0".to_string(), "doc_chunk_1".to_string()],
                &[
                    "The invoice is due on the first of March.".to_string(),
                    "Quarterly revenue grew by twelve percent.".to_string(),
                ],
                &[Metadata::new(), Metadata::new()],
            )
            .await
            .unwrap();

        let result = store.query("when is the invoice due", 2).await.unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.documents[0].contains("invoice"));
        assert_eq!(result.metadatas[0], None);
    }

    #[tokio::test]
    async fn test_same_id_replaces() {
        let store = store();
        let ids = vec!["x".to_string()];
        store
            .add(&ids, &["first".to_string()], &[Metadata::new()])
            .await
            .unwrap();
        store
            .add(&ids, &["second".to_string()], &[Metadata::new()])
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 1);
        store.reset().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_short_embedding_batch_is_rejected() {
        let store = MemoryStore::new("lossy", Arc::new(LossyEmbedder::new()));
        let ids = vec!["a".to_string(), "b".to_string()];
        let texts = vec!["first passage".to_string(), "second passage".to_string()];

        let err = store
            .add(&ids, &texts, &[Metadata::new(), Metadata::new()])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Knowledge(_)));
        assert_eq!(store.count().await.unwrap(), 0);
    }
}

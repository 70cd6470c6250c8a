//! Corpus store abstraction.
//!
//! A store embeds passages on `add` and answers nearest-neighbour queries
//! by cosine distance (`1 - cosine similarity`, ascending).

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::embeddings::EmbeddingProvider;
use crate::types::Metadata;
use ragline_core::{AppError, AppResult};

/// Result of a nearest-neighbour query; the three vectors are parallel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub documents: Vec<String>,
    /// `None` when a passage was stored without metadata
    pub metadatas: Vec<Option<Metadata>>,
    pub distances: Vec<f32>,
}

impl QueryResult {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Trait for corpus store backends.
#[async_trait::async_trait]
pub trait VectorStore: Send + Sync {
    /// Collection name shown in status output.
    fn name(&self) -> &str;

    /// Where the data lives (file path or `memory`).
    fn location(&self) -> String;

    /// Embed and store passages. The three slices must have equal length.
    async fn add(&self, ids: &[String], texts: &[String], metadatas: &[Metadata]) -> AppResult<()>;

    /// Return up to `k` passages closest to `text`.
    async fn query(&self, text: &str, k: usize) -> AppResult<QueryResult>;

    /// Number of stored passages.
    async fn count(&self) -> AppResult<usize>;

    /// Remove every stored passage.
    async fn reset(&self) -> AppResult<()>;
}

pub(crate) fn check_add_lengths(
    ids: &[String],
    texts: &[String],
    metadatas: &[Metadata],
) -> AppResult<()> {
    if ids.len() != texts.len() || ids.len() != metadatas.len() {
        return Err(AppError::Knowledge(format!(
            "Mismatched add batch: {} ids, {} texts, {} metadatas",
            ids.len(),
            texts.len(),
            metadatas.len()
        )));
    }
    Ok(())
}

/// Embed `texts`, requiring exactly one vector per passage.
pub(crate) async fn embed_passages(
    embedder: &dyn EmbeddingProvider,
    texts: &[String],
) -> AppResult<Vec<Vec<f32>>> {
    let embeddings = embedder.embed_batch(texts).await?;
    if embeddings.len() != texts.len() {
        return Err(AppError::Knowledge(format!(
            "Embedding provider {} returned {} vectors for {} passages",
            embedder.provider_name(),
            embeddings.len(),
            texts.len()
        )));
    }
    Ok(embeddings)
}

/// Calculate cosine similarity between two vectors.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

/// Score `(text, metadata, embedding)` rows against a query embedding and
/// keep the `k` nearest. Ties keep insertion order.
pub(crate) fn nearest<I>(query_embedding: &[f32], rows: I, k: usize) -> QueryResult
where
    I: IntoIterator<Item = (String, Option<Metadata>, Vec<f32>)>,
{
    let mut scored: Vec<(f32, String, Option<Metadata>)> = rows
        .into_iter()
        .map(|(text, metadata, embedding)| {
            let distance = 1.0 - cosine_similarity(query_embedding, &embedding);
            (distance, text, metadata)
        })
        .collect();

    scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);

    let mut result = QueryResult::default();
    for (distance, text, metadata) in scored {
        result.documents.push(text);
        result.metadatas.push(metadata);
        result.distances.push(distance);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1.0, 0.0, 0.0], &[1.0, 0.0, 0.0]) - 1.0).abs() < 0.001);
        assert!(cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]).abs() < 0.001);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn test_nearest_orders_by_distance_and_truncates() {
        let rows = vec![
            ("far".to_string(), None, vec![-1.0, 0.0]),
            ("near".to_string(), None, vec![1.0, 0.0]),
            ("middle".to_string(), None, vec![0.7, 0.7]),
        ];

        let result = nearest(&[1.0, 0.0], rows, 2);
        assert_eq!(result.documents, vec!["near", "middle"]);
        assert!(result.distances[0] < 0.001);
        assert!(result.distances[0] <= result.distances[1]);
    }

    #[test]
    fn test_check_add_lengths() {
        let ids = vec!["a".to_string()];
        let texts = vec!["x".to_string()];
        assert!(check_add_lengths(&ids, &texts, &[Metadata::new()]).is_ok());
        assert!(check_add_lengths(&ids, &texts, &[]).is_err());
    }
}

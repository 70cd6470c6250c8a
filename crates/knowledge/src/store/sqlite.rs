//! SQLite-backed persistent corpus.

use super::{check_add_lengths, embed_passages, nearest, QueryResult, VectorStore};
use crate::embeddings::EmbeddingProvider;
use crate::types::Metadata;
use chrono::Utc;
use ragline_core::{AppError, AppResult};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Persistent corpus stored in a single SQLite file.
///
/// The embedding provider and model that built the corpus are recorded on
/// first write; opening it later with a different provider fails instead of
/// silently mixing vector spaces.
pub struct SqliteStore {
    name: String,
    path: PathBuf,
    conn: Mutex<Connection>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl SqliteStore {
    /// Open (or create) the corpus at `db_path`.
    pub fn open(
        db_path: &Path,
        name: impl Into<String>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> AppResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Knowledge(format!("Failed to create corpus directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| AppError::Knowledge(format!("Failed to open corpus: {}", e)))?;

        init_schema(&conn)?;
        check_embedder(&conn, embedder.as_ref())?;

        tracing::debug!("Opened corpus at {:?}", db_path);

        Ok(Self {
            name: name.into(),
            path: db_path.to_path_buf(),
            conn: Mutex::new(conn),
            embedder,
        })
    }

    fn lock(&self) -> AppResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| AppError::Knowledge("Corpus connection lock poisoned".to_string()))
    }
}

fn init_schema(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;

        CREATE TABLE IF NOT EXISTS chunks (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            text TEXT NOT NULL,
            embedding BLOB NOT NULL,
            metadata TEXT,
            added_at TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS corpus_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );
        "#,
    )
    .map_err(|e| AppError::Knowledge(format!("Failed to create tables: {}", e)))
}

fn read_meta(conn: &Connection, key: &str) -> AppResult<Option<String>> {
    conn.query_row(
        "SELECT value FROM corpus_meta WHERE key = ?1",
        params![key],
        |row| row.get(0),
    )
    .optional()
    .map_err(|e| AppError::Knowledge(format!("Failed to read corpus metadata: {}", e)))
}

/// Record the embedder on first use, reject a different one afterwards.
fn check_embedder(conn: &Connection, embedder: &dyn EmbeddingProvider) -> AppResult<()> {
    let expected = format!(
        "{}/{}/{}",
        embedder.provider_name(),
        embedder.model_name(),
        embedder.dimensions()
    );

    match read_meta(conn, "embedder")? {
        Some(existing) if existing != expected => Err(AppError::Knowledge(format!(
            "Corpus was built with embedder '{}' but '{}' is configured. Run 'ragline learn --reset' to rebuild it.",
            existing, expected
        ))),
        Some(_) => Ok(()),
        None => conn
            .execute(
                "INSERT INTO corpus_meta (key, value) VALUES ('embedder', ?1)",
                params![expected],
            )
            .map(|_| ())
            .map_err(|e| AppError::Knowledge(format!("Failed to write corpus metadata: {}", e))),
    }
}

#[async_trait::async_trait]
impl VectorStore for SqliteStore {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn add(&self, ids: &[String], texts: &[String], metadatas: &[Metadata]) -> AppResult<()> {
        check_add_lengths(ids, texts, metadatas)?;
        if ids.is_empty() {
            return Ok(());
        }

        let embeddings = embed_passages(self.embedder.as_ref(), texts).await?;
        let added_at = Utc::now().to_rfc3339();

        let mut conn = self.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| AppError::Knowledge(format!("Failed to begin transaction: {}", e)))?;

        for ((id, text), (metadata, embedding)) in ids
            .iter()
            .zip(texts)
            .zip(metadatas.iter().zip(&embeddings))
        {
            let metadata_json = serde_json::to_string(metadata)?;
            tx.execute(
                "INSERT OR REPLACE INTO chunks (id, text, embedding, metadata, added_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![id, text, embedding_to_bytes(embedding), metadata_json, added_at],
            )
            .map_err(|e| AppError::Knowledge(format!("Failed to insert chunk: {}", e)))?;
        }

        tx.commit()
            .map_err(|e| AppError::Knowledge(format!("Failed to commit batch: {}", e)))?;

        tracing::debug!(count = ids.len(), "Added chunks to corpus");
        Ok(())
    }

    async fn query(&self, text: &str, k: usize) -> AppResult<QueryResult> {
        let query_embedding = self.embedder.embed(text).await?;

        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT text, metadata, embedding FROM chunks ORDER BY seq")
            .map_err(|e| AppError::Knowledge(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| {
                let text: String = row.get(0)?;
                let metadata_json: Option<String> = row.get(1)?;
                let embedding_bytes: Vec<u8> = row.get(2)?;
                Ok((text, metadata_json, embedding_bytes))
            })
            .map_err(|e| AppError::Knowledge(format!("Failed to query chunks: {}", e)))?;

        let mut decoded = Vec::new();
        for row in rows {
            let (text, metadata_json, embedding_bytes) =
                row.map_err(|e| AppError::Knowledge(format!("Failed to read chunk: {}", e)))?;
            let metadata = metadata_json
                .as_deref()
                .and_then(|json| serde_json::from_str::<Metadata>(json).ok())
                .filter(|m| !m.is_empty());
            decoded.push((text, metadata, bytes_to_embedding(&embedding_bytes)?));
        }

        let result = nearest(&query_embedding, decoded, k);
        tracing::debug!(
            "Retrieved {} chunks (requested top-{})",
            result.len(),
            k
        );
        Ok(result)
    }

    async fn count(&self) -> AppResult<usize> {
        let conn = self.lock()?;
        conn.query_row("SELECT COUNT(*) FROM chunks", [], |row| row.get::<_, i64>(0))
            .map(|n| n as usize)
            .map_err(|e| AppError::Knowledge(format!("Failed to count chunks: {}", e)))
    }

    async fn reset(&self) -> AppResult<()> {
        let conn = self.lock()?;
        conn.execute_batch("DELETE FROM chunks; DELETE FROM corpus_meta;")
            .map_err(|e| AppError::Knowledge(format!("Failed to reset corpus: {}", e)))?;
        check_embedder(&conn, self.embedder.as_ref())?;

        tracing::info!("Reset corpus '{}'", self.name);
        Ok(())
    }
}

/// Convert embedding vector to bytes for storage.
fn embedding_to_bytes(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Convert bytes back to embedding vector.
fn bytes_to_embedding(bytes: &[u8]) -> AppResult<Vec<f32>> {
    if bytes.len() % 4 != 0 {
        return Err(AppError::Knowledge(
            "Invalid embedding bytes length".to_string(),
        ));
    }

    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::providers::TrigramProvider;
    use crate::tests::support::LossyEmbedder;
    use tempfile::TempDir;

    fn meta(chunk_id: &str) -> Metadata {
        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), "persistent".into());
        metadata.insert("chunk_id".to_string(), chunk_id.into());
        metadata
    }

    fn open(dir: &TempDir) -> SqliteStore {
        SqliteStore::open(
            &dir.path().join("corpus.sqlite"),
            "persistent",
            Arc::new(TrigramProvider::new(128)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_add_query_count() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);

        store
            .add(
                &["a".to_string(), "b".to_string()],
                &[
                    "Passport renewal takes two weeks online.".to_string(),
                    "Pasta should boil for eleven minutes.".to_string(),
                ],
                &[meta("a"), meta("b")],
            )
            .await
            .unwrap();

        assert_eq!(store.count().await.unwrap(), 2);

        let result = store.query("passport renewal", 1).await.unwrap();
        assert_eq!(result.len(), 1);
        assert!(result.documents[0].contains("Passport"));
        assert_eq!(
            result.metadatas[0].as_ref().unwrap()["chunk_id"],
            serde_json::json!("a")
        );
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        {
            let store = open(&dir);
            store
                .add(&["a".to_string()], &["hello corpus".to_string()], &[meta("a")])
                .await
                .unwrap();
        }

        let store = open(&dir);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_different_embedder_is_rejected() {
        let dir = TempDir::new().unwrap();
        drop(open(&dir));

        let result = SqliteStore::open(
            &dir.path().join("corpus.sqlite"),
            "persistent",
            Arc::new(TrigramProvider::new(256)),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reset_clears_chunks() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store
            .add(&["a".to_string()], &["some text".to_string()], &[meta("a")])
            .await
            .unwrap();

        store.reset().await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.query("some text", 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_metadata_reads_back_as_none() {
        let dir = TempDir::new().unwrap();
        let store = open(&dir);
        store
            .add(&["a".to_string()], &["bare chunk".to_string()], &[Metadata::new()])
            .await
            .unwrap();

        let result = store.query("bare chunk", 1).await.unwrap();
        assert_eq!(result.metadatas, vec![None]);
    }

    #[test]
    fn test_embedding_bytes_roundtrip() {
        let embedding = vec![0.5, -1.25, 3.0];
        let bytes = embedding_to_bytes(&embedding);
        assert_eq!(bytes.len(), 12);
        assert_eq!(bytes_to_embedding(&bytes).unwrap(), embedding);
        assert!(bytes_to_embedding(&bytes[..5]).is_err());
    }

    #[tokio::test]
    async fn test_short_embedding_batch_is_rejected() {
        let dir = TempDir::new().unwrap();
        let store = SqliteStore::open(
            &dir.path().join("corpus.sqlite"),
            "persistent",
            Arc::new(LossyEmbedder::new()),
        )
        .unwrap();
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

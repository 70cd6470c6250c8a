//! Ingestion of local files into the persistent corpus.

use crate::chunker::chunk_text;
use crate::embeddings::EmbeddingProvider;
use crate::store::VectorStore;
use crate::types::{CorpusState, CorpusStatus, LearnOptions, LearnStats, Metadata, CHUNK_ID_KEY};
use ragline_core::{AppError, AppResult};
use std::path::{Path, PathBuf};
use std::time::Instant;
use walkdir::WalkDir;

/// A chunk waiting for the next batched `add`.
struct PendingChunk {
    id: String,
    text: String,
    metadata: Metadata,
}

/// Ingest files and directories into `store`.
///
/// Directories are walked recursively and filtered by extension. Unreadable
/// or empty files are logged and counted as skipped; store failures abort.
pub async fn learn(store: &dyn VectorStore, options: &LearnOptions) -> AppResult<LearnStats> {
    let start = Instant::now();

    tracing::info!(
        "Starting learn into '{}' from {} path(s)",
        store.name(),
        options.paths.len()
    );

    if options.reset {
        tracing::info!("Resetting corpus '{}'", store.name());
        store.reset().await?;
    }

    let mut stats = LearnStats::default();
    let mut pending: Vec<PendingChunk> = Vec::new();

    for path in collect_files(options)? {
        let text = match read_source(&path) {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::warn!("Skipping empty file: {:?}", path);
                stats.skipped_count += 1;
                continue;
            }
            Err(e) => {
                tracing::warn!("Skipping {:?}: {}", path, e);
                stats.skipped_count += 1;
                continue;
            }
        };

        let doc_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let chunks = chunk_text(&text, options.chunk_size, options.chunk_overlap)?;
        tracing::debug!("Created {} chunks for {}", chunks.len(), doc_name);

        stats.sources_count += 1;
        stats.bytes_processed += text.len() as u64;

        for chunk in chunks {
            let id = uuid::Uuid::new_v4().to_string();
            pending.push(PendingChunk {
                metadata: persistent_metadata(&doc_name, &id),
                id,
                text: chunk,
            });

            if pending.len() >= options.batch_size {
                stats.chunks_count += flush(store, &mut pending).await?;
            }
        }
    }

    stats.chunks_count += flush(store, &mut pending).await?;
    stats.duration_secs = start.elapsed().as_secs_f64();

    tracing::info!(
        "Learn completed: {} sources, {} chunks, {} skipped, {} bytes in {:.2}s",
        stats.sources_count,
        stats.chunks_count,
        stats.skipped_count,
        stats.bytes_processed,
        stats.duration_secs
    );

    Ok(stats)
}

/// Summarize the persistent corpus.
pub async fn status(
    store: &dyn VectorStore,
    embedder: &dyn EmbeddingProvider,
) -> AppResult<CorpusStatus> {
    let document_count = store.count().await?;

    Ok(CorpusStatus {
        collection_name: store.name().to_string(),
        document_count,
        location: store.location(),
        status: if document_count > 0 {
            CorpusState::Active
        } else {
            CorpusState::Empty
        },
        embedding_provider: embedder.provider_name().to_string(),
        embedding_model: embedder.model_name().to_string(),
    })
}

fn persistent_metadata(doc_name: &str, chunk_id: &str) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("doc_name".to_string(), doc_name.into());
    metadata.insert("chunk_type".to_string(), "original".into());
    metadata.insert("source".to_string(), "persistent".into());
    metadata.insert(CHUNK_ID_KEY.to_string(), chunk_id.into());
    metadata
}

async fn flush(store: &dyn VectorStore, pending: &mut Vec<PendingChunk>) -> AppResult<u32> {
    if pending.is_empty() {
        return Ok(0);
    }

    let batch = std::mem::take(pending);
    let mut ids = Vec::with_capacity(batch.len());
    let mut texts = Vec::with_capacity(batch.len());
    let mut metadatas = Vec::with_capacity(batch.len());
    for chunk in batch {
        ids.push(chunk.id);
        texts.push(chunk.text);
        metadatas.push(chunk.metadata);
    }

    store.add(&ids, &texts, &metadatas).await?;
    tracing::debug!("Added batch of {} chunks", ids.len());

    Ok(ids.len() as u32)
}

/// Expand the requested paths into a sorted list of matching files.
fn collect_files(options: &LearnOptions) -> AppResult<Vec<PathBuf>> {
    let mut files = Vec::new();

    for path in &options.paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            for entry in WalkDir::new(path)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
            {
                let entry_path = entry.path();
                if entry_path.is_file() && has_extension(entry_path, &options.extensions) {
                    files.push(entry_path.to_path_buf());
                }
            }
        } else {
            return Err(AppError::Validation(format!(
                "Path does not exist: {}",
                path.display()
            )));
        }
    }

    Ok(files)
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| extensions.iter().any(|allowed| allowed.eq_ignore_ascii_case(e)))
        .unwrap_or(false)
}

/// Read a source file as text. `Ok(None)` means the file holds no text.
fn read_source(path: &Path) -> AppResult<Option<String>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| AppError::Knowledge(format!("Failed to read {:?}: {}", path, e)))?;

    if raw.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(raw))
}

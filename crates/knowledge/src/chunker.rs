//! Text chunking with configurable size and overlap.

use ragline_core::{AppError, AppResult};
use text_splitter::{ChunkConfig, TextSplitter};

/// Split `text` into chunks of at most `chunk_size` characters, with
/// `overlap` characters shared between neighbours.
///
/// Splits prefer paragraph, sentence and word boundaries. Blank chunks are
/// dropped.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> AppResult<Vec<String>> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let config = ChunkConfig::new(chunk_size)
        .with_overlap(overlap)
        .map_err(|e| AppError::Config(format!("Invalid chunk settings: {}", e)))?;
    let splitter = TextSplitter::new(config);

    let chunks: Vec<String> = splitter
        .chunks(text)
        .filter(|chunk| !chunk.trim().is_empty())
        .map(str::to_string)
        .collect();

    tracing::debug!(
        "Chunked text into {} chunks (size: {}, overlap: {})",
        chunks.len(),
        chunk_size,
        overlap
    );

    Ok(chunks)
}

//! Learn command handler.
//!
//! Ingests local files into the persistent corpus.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::LearnOptions;
use std::path::PathBuf;

/// Ingest files or directories into the persistent corpus
#[derive(Args, Debug)]
pub struct LearnCommand {
    /// Files or directories to ingest
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,

    /// Clear the corpus before ingesting
    #[arg(long)]
    pub reset: bool,

    /// File extensions to ingest (default: txt, md)
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl LearnCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing learn command");
        tracing::debug!("Learn options: {:?}", self);

        let mut options = LearnOptions::new(self.paths.clone(), &config.retrieval);
        options.reset = self.reset;
        if !self.extensions.is_empty() {
            options.extensions = self
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect();
        }

        let (store, _embedder) = ragline_knowledge::open_corpus(config)?;
        let stats = ragline_knowledge::learn(&store, &options).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&stats)?);
        } else {
            println!(
                "Learned {} sources ({} chunks, {} bytes, {} skipped) in {:.2}s",
                stats.sources_count,
                stats.chunks_count,
                stats.bytes_processed,
                stats.skipped_count,
                stats.duration_secs
            );
        }

        Ok(())
    }
}

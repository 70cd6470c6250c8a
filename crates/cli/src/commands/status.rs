//! Status command handler.

use clap::Args;
use ragline_core::{config::AppConfig, AppResult};
use ragline_knowledge::CorpusState;

/// Show persistent corpus status
#[derive(Args, Debug)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl StatusCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing status command");

        let (store, embedder) = ragline_knowledge::open_corpus(config)?;
        let status = ragline_knowledge::status(&store, embedder.as_ref()).await?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&status)?);
            return Ok(());
        }

        let state = match status.status {
            CorpusState::Active => "active",
            CorpusState::Empty => "empty",
        };
        println!("Collection: {}", status.collection_name);
        println!("Status:     {}", state);
        println!("Chunks:     {}", status.document_count);
        println!("Location:   {}", status.location);
        println!(
            "Embeddings: {}/{}",
            status.embedding_provider, status.embedding_model
        );

        Ok(())
    }
}

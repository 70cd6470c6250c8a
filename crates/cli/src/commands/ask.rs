//! Ask command handler.
//!
//! Runs one question through the adaptive pipeline, optionally grounded in
//! an attached document.

use clap::Args;
use ragline_core::{config::AppConfig, AppError, AppResult};
use ragline_knowledge::{AttachedDocument, Engine, QaResponse};
use std::path::PathBuf;

/// Name given to documents passed inline with `--text`.
const INLINE_DOCUMENT_NAME: &str = "pasted_text";

/// Ask a question
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: String,

    /// Attach a text file as per-question context
    #[arg(short, long, conflicts_with = "text")]
    pub document: Option<PathBuf>,

    /// Attach raw text as per-question context
    #[arg(long)]
    pub text: Option<String>,

    /// Output the full response as JSON
    #[arg(long)]
    pub json: bool,

    /// Print only the short answer
    #[arg(long, conflicts_with = "json")]
    pub short: bool,
}

/// A question checked and ready for the engine.
#[derive(Debug)]
pub struct AskInput {
    pub question: String,
    pub document: Option<AttachedDocument>,
}

impl AskCommand {
    /// Validate the question and load the attached document.
    ///
    /// Runs before the engine is built so bad input never reaches a provider.
    pub fn prepare(&self, config: &AppConfig) -> AppResult<AskInput> {
        let question = self.question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("Question cannot be empty".to_string()));
        }

        let document = match (&self.document, &self.text) {
            (Some(path), _) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    AppError::Validation(format!("Failed to read document {:?}: {}", path, e))
                })?;
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                Some(AttachedDocument::new(name, text))
            }
            (None, Some(text)) => Some(AttachedDocument::new(INLINE_DOCUMENT_NAME, text.clone())),
            (None, None) => None,
        };

        if let Some(ref doc) = document {
            let max = config.retrieval.max_document_chars;
            let chars = doc.text.chars().count();
            if chars > max {
                return Err(AppError::Validation(format!(
                    "Attached document '{}' is {} characters; the limit is {}",
                    doc.name, chars, max
                )));
            }
            if doc.text.trim().is_empty() {
                tracing::warn!("Attached document '{}' is empty; ignoring it", doc.name);
                return Ok(AskInput {
                    question: question.to_string(),
                    document: None,
                });
            }
        }

        Ok(AskInput {
            question: question.to_string(),
            document,
        })
    }

    /// Execute the ask command against a ready engine.
    pub async fn execute(&self, input: AskInput, engine: &Engine) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!(
            document = input.document.as_ref().map(|d| d.name.as_str()),
            "Ask command input"
        );

        let response = engine.ask(&input.question, input.document).await?;
        self.print(&response)
    }

    fn print(&self, response: &QaResponse) -> AppResult<()> {
        if self.json {
            let json = serde_json::to_string_pretty(response)?;
            println!("{}", json);
            return Ok(());
        }

        if self.short {
            println!("{}", response.short_answer);
            return Ok(());
        }

        println!("{}", response.long_answer);
        println!();
        println!("Summary: {}", response.short_answer);

        let info = &response.query_info;
        let sources: Vec<&str> = info.sources_used.iter().map(|s| s.as_str()).collect();
        eprintln!();
        eprintln!(
            "[{} | {} | sources: {}]",
            info.method,
            info.query_type,
            sources.join(", ")
        );

        Ok(())
    }
}

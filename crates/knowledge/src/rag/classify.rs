//! Query classification.

use super::generator::TextGenerator;
use super::types::QueryType;
use ragline_prompt::ids;

/// Label `question` as conversational, factual or document-specific.
///
/// Unrecognised output and provider failures both yield `Factual`, which
/// keeps retrieval and web search available.
pub async fn classify(generator: &TextGenerator, question: &str) -> QueryType {
    match generator.generate(ids::CLASSIFY, &[("question", question)]).await {
        Ok(output) => QueryType::parse_label(&output).unwrap_or_else(|| {
            tracing::warn!(output = %output, "Unrecognised classifier label, using factual");
            QueryType::Factual
        }),
        Err(e) => {
            tracing::warn!("Classification failed, using factual: {}", e);
            QueryType::Factual
        }
    }
}

//! Long and short answer synthesis with deterministic fallbacks.

use super::generator::TextGenerator;
use ragline_prompt::ids;

pub const UNABLE_TO_ANSWER: &str = "I'm unable to provide an answer to that question.";
pub const DIRECT_FALLBACK: &str = "I'm here to help! How can I assist you today?";

/// Reply to a conversational message without retrieval.
pub async fn direct_answer(generator: &TextGenerator, question: &str) -> String {
    match generator.generate(ids::DIRECT, &[("question", question)]).await {
        Ok(answer) if !answer.is_empty() => answer,
        Ok(_) => DIRECT_FALLBACK.to_string(),
        Err(e) => {
            tracing::warn!("Direct answer failed: {}", e);
            DIRECT_FALLBACK.to_string()
        }
    }
}

/// Best-effort answer with no context. Returns a fixed apology only when
/// the provider produces nothing.
pub async fn general_answer(generator: &TextGenerator, question: &str) -> String {
    match generator
        .generate(ids::GENERAL_ANSWER, &[("question", question)])
        .await
    {
        Ok(answer) if !answer.is_empty() => answer,
        Ok(_) => UNABLE_TO_ANSWER.to_string(),
        Err(e) => {
            tracing::warn!("General knowledge answer failed: {}", e);
            UNABLE_TO_ANSWER.to_string()
        }
    }
}

/// Detailed answer from the gated context, else the web text, else general
/// knowledge.
pub async fn long_answer(
    generator: &TextGenerator,
    question: &str,
    context: &str,
    web_results: &str,
) -> String {
    let evidence = if !context.is_empty() {
        context
    } else {
        web_results
    };

    if evidence.is_empty() {
        tracing::debug!("No context or web results, answering from general knowledge");
        return general_answer(generator, question).await;
    }

    match generator
        .generate(
            ids::LONG_ANSWER,
            &[("question", question), ("context", evidence)],
        )
        .await
    {
        Ok(answer) if !answer.is_empty() => answer,
        Ok(_) => {
            tracing::warn!("Long answer was empty, answering from general knowledge");
            general_answer(generator, question).await
        }
        Err(e) => {
            tracing::warn!("Long answer failed, answering from general knowledge: {}", e);
            general_answer(generator, question).await
        }
    }
}

/// Condense `long_answer`; falls back to its first two sentences.
pub async fn short_answer(generator: &TextGenerator, question: &str, long_answer: &str) -> String {
    match generator
        .generate(
            ids::SHORT_ANSWER,
            &[("question", question), ("long_answer", long_answer)],
        )
        .await
    {
        Ok(answer) if !answer.is_empty() => answer,
        Ok(_) => {
            tracing::warn!("Short answer was empty, truncating long answer");
            first_two_sentences(long_answer)
        }
        Err(e) => {
            tracing::warn!("Short answer failed, truncating long answer: {}", e);
            first_two_sentences(long_answer)
        }
    }
}

/// First two `". "`-separated sentences, ending in exactly one period.
/// Text with fewer than two separators is returned unchanged.
pub fn first_two_sentences(text: &str) -> String {
    let parts: Vec<&str> = text.split(". ").collect();
    if parts.len() < 2 {
        return text.to_string();
    }

    let joined = parts[..2].join(". ");
    format!("{}.", joined.trim_end_matches('.'))
}

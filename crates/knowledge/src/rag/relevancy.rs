//! Relevancy gate over the assembled context.

use super::generator::TextGenerator;
use ragline_prompt::ids;

/// Verdict parsed from the gate's output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Relevant,
    NotRelevant,
    /// Neither label was recognised
    Unclear,
}

/// Parse the gate output with exact labels.
///
/// The negative label is checked first, so `not_relevant` can never be read
/// as `relevant`.
pub fn parse_verdict(output: &str) -> Verdict {
    let normalized = output.trim().to_lowercase();

    if normalized.contains("not_relevant")
        || normalized.contains("not relevant")
        || normalized.contains("irrelevant")
    {
        return Verdict::NotRelevant;
    }

    let first_word = normalized
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .find(|w| !w.is_empty());
    if first_word == Some("relevant") {
        Verdict::Relevant
    } else {
        Verdict::Unclear
    }
}

/// First `max_chars` characters of `text`.
pub fn char_prefix(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Ask whether `context` helps answer `question`.
///
/// Only `max_chars` of context are sent. Unclear output and provider
/// failures accept the context.
pub async fn is_relevant(
    generator: &TextGenerator,
    question: &str,
    context: &str,
    max_chars: usize,
) -> bool {
    let prefix = char_prefix(context, max_chars);

    match generator
        .generate(ids::RELEVANCY, &[("question", question), ("context", prefix)])
        .await
    {
        Ok(output) => match parse_verdict(&output) {
            Verdict::Relevant => true,
            Verdict::NotRelevant => false,
            Verdict::Unclear => {
                tracing::warn!(output = %output, "Unclear relevancy verdict, accepting context");
                true
            }
        },
        Err(e) => {
            tracing::warn!("Relevancy check failed, accepting context: {}", e);
            true
        }
    }
}

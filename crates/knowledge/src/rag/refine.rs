//! Query refinement and step-back expansion.

use super::generator::TextGenerator;
use ragline_prompt::ids;
use regex::Regex;
use std::sync::LazyLock;

/// Maximum number of expansion questions kept.
pub const MAX_EXPANSIONS: usize = 3;

static NUMBERED_LINE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?m)^[ \t]*\d+\.[ \t]*(.*?)[ \t]*$").ok());

/// Rewrite `question` for retrieval. Empty output and failures keep the
/// original question.
pub async fn refine(generator: &TextGenerator, question: &str) -> String {
    match generator.generate(ids::REFINE, &[("question", question)]).await {
        Ok(refined) if !refined.is_empty() => refined,
        Ok(_) => {
            tracing::warn!("Refiner returned nothing, keeping original question");
            question.to_string()
        }
        Err(e) => {
            tracing::warn!("Refinement failed, keeping original question: {}", e);
            question.to_string()
        }
    }
}

/// Generate up to three broader companion questions for `refined_query`.
pub async fn expand(generator: &TextGenerator, refined_query: &str) -> Vec<String> {
    match generator.generate(ids::EXPAND, &[("question", refined_query)]).await {
        Ok(output) => {
            let expansions = parse_numbered_list(&output);
            if expansions.is_empty() {
                tracing::warn!("No numbered questions found in expansion output");
            }
            expansions
        }
        Err(e) => {
            tracing::warn!("Expansion failed, continuing without: {}", e);
            Vec::new()
        }
    }
}

/// Extract `<n>. <text>` items, dropping blanks and keeping the first three.
pub fn parse_numbered_list(text: &str) -> Vec<String> {
    let Some(pattern) = NUMBERED_LINE.as_ref() else {
        return Vec::new();
    };

    pattern
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|item| !item.is_empty())
        .take(MAX_EXPANSIONS)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::{generator, ScriptedLlm};

    #[test]
    fn test_parse_numbered_list() {
        let text = "Here you go:\n1. What is a passport?\n  2.   Who issues passports?  \n3.\n4. How long is one valid?\n5. Extra?";
        assert_eq!(
            parse_numbered_list(text),
            vec![
                "What is a passport?",
                "Who issues passports?",
                "How long is one valid?"
            ]
        );
    }

    #[test]
    fn test_parse_without_numbers_is_empty() {
        assert!(parse_numbered_list("- bullet\n- another").is_empty());
        assert!(parse_numbered_list("").is_empty());
    }

    #[tokio::test]
    async fn test_refine_trims_and_falls_back() {
        let llm = ScriptedLlm::new().on_refine("  What are the renewal steps?  ");
        assert_eq!(
            refine(&generator(llm), "renew?").await,
            "What are the renewal steps?"
        );

        let llm = ScriptedLlm::new().on_refine("   ");
        assert_eq!(refine(&generator(llm), "renew?").await, "renew?");

        let llm = ScriptedLlm::new().fail_refine();
        assert_eq!(refine(&generator(llm), "renew?").await, "renew?");
    }

    #[tokio::test]
    async fn test_expand_failure_is_empty() {
        let llm = ScriptedLlm::new().fail_expand();
        assert!(expand(&generator(llm), "q").await.is_empty());
    }
}

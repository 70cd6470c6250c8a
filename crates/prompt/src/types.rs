//! Prompt types for Ragline.
//!
//! This module defines the domain entities for the prompt system.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Sampling overrides for this prompt
    #[serde(default)]
    pub behavior: PromptBehavior,

    /// Input specification
    #[serde(default)]
    pub input: PromptInputSpec,

    /// Template string with Handlebars syntax
    pub template: String,

    /// Output specification
    pub output: PromptOutputSpec,
}

/// Sampling overrides. Unset fields fall back to the configured defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PromptBehavior {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(rename = "maxTokens", skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Input specification for the prompt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptInputSpec {
    /// Template variables the caller is expected to supply
    #[serde(default)]
    pub variables: Vec<String>,
}

/// Output specification for the prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptOutputSpec {
    /// Output format (e.g., "text", "label", "numbered_list", "markdown")
    pub format: String,
}

/// A fully built prompt ready for LLM execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPrompt {
    /// Rendered prompt text
    pub user: String,

    /// Sampling overrides carried over from the definition
    pub behavior: PromptBehavior,

    /// Metadata about the built prompt
    pub metadata: BuiltPromptMetadata,
}

/// Metadata about a built prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltPromptMetadata {
    /// Source prompt ID
    #[serde(rename = "sourcePromptId")]
    pub source_prompt_id: String,

    /// Declared variables the caller did not supply
    #[serde(rename = "missingVariables", default)]
    pub missing_variables: Vec<String>,

    /// Names of the template variables that were supplied
    #[serde(rename = "resolvedVariables")]
    pub resolved_variables: Vec<String>,
}

impl BuiltPrompt {
    /// Create a new built prompt.
    pub fn new(
        user: String,
        definition: &PromptDefinition,
        variables: &HashMap<String, String>,
    ) -> Self {
        let mut resolved_variables: Vec<String> = variables.keys().cloned().collect();
        resolved_variables.sort();

        let missing_variables = definition
            .input
            .variables
            .iter()
            .filter(|name| !variables.contains_key(*name))
            .cloned()
            .collect();

        Self {
            user,
            behavior: definition.behavior.clone(),
            metadata: BuiltPromptMetadata {
                source_prompt_id: definition.id.clone(),
                missing_variables,
                resolved_variables,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn definition() -> PromptDefinition {
        serde_yaml::from_str(
            r#"
id: test.prompt
title: Test Prompt
apiVersion: "1.0"
createdBy: test
behavior:
  temperature: 0.0
  maxTokens: 10
input:
  variables: [question, context]
template: "{{question}}"
output:
  format: label
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_prompt_definition_deserialization() {
        let def = definition();
        assert_eq!(def.id, "test.prompt");
        assert_eq!(def.behavior.temperature, Some(0.0));
        assert_eq!(def.behavior.max_tokens, Some(10));
        assert_eq!(def.input.variables, vec!["question", "context"]);
        assert_eq!(def.output.format, "label");
    }

    #[test]
    fn test_behavior_is_optional() {
        let def: PromptDefinition = serde_yaml::from_str(
            r#"
id: bare
title: Bare
apiVersion: "1.0"
template: "hi"
output:
  format: text
"#,
        )
        .unwrap();
        assert_eq!(def.behavior, PromptBehavior::default());
        assert!(def.input.variables.is_empty());
    }

    #[test]
    fn test_built_prompt_tracks_missing_variables() {
        let def = definition();
        let mut vars = HashMap::new();
        vars.insert("question".to_string(), "What is BM25?".to_string());

        let built = BuiltPrompt::new("What is BM25?".to_string(), &def, &vars);

        assert_eq!(built.metadata.source_prompt_id, "test.prompt");
        assert_eq!(built.metadata.resolved_variables, vec!["question"]);
        assert_eq!(built.metadata.missing_variables, vec!["context"]);
        assert_eq!(built.behavior.max_tokens, Some(10));
    }
}

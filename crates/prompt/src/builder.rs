//! Prompt rendering.

use crate::loader::{load_prompt, BUILTIN_PROMPTS};
use crate::types::{BuiltPrompt, PromptDefinition};
use handlebars::Handlebars;
use ragline_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// Build a prompt from a definition and input variables.
///
/// # Example
/// ```no_run
/// use ragline_prompt::{build_prompt, PromptDefinition};
/// use std::collections::HashMap;
///
/// # fn example(def: PromptDefinition) -> Result<(), Box<dyn std::error::Error>> {
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "What is Rust?".to_string());
///
/// let built = build_prompt(&def, &vars)?;
/// println!("Prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: &HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    let rendered = render_template(&definition.template, variables)?;
    Ok(BuiltPrompt::new(rendered, definition, variables))
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Disable HTML escaping for plain text
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .render_template(template, variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

/// The set of prompts the question-answering pipeline renders.
///
/// Every template is compiled once at load time so a broken workspace
/// override fails at startup rather than mid-run.
pub struct PromptLibrary {
    definitions: HashMap<String, PromptDefinition>,
    registry: Handlebars<'static>,
}

impl PromptLibrary {
    /// Load every built-in prompt, applying workspace overrides.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let definitions = BUILTIN_PROMPTS
            .iter()
            .map(|(id, _)| load_prompt(workspace_path, id))
            .collect::<AppResult<Vec<_>>>()?;

        Self::from_definitions(definitions)
    }

    /// Build a library from already-parsed definitions.
    pub fn from_definitions(definitions: Vec<PromptDefinition>) -> AppResult<Self> {
        let mut registry = Handlebars::new();
        registry.register_escape_fn(handlebars::no_escape);

        let mut by_id = HashMap::with_capacity(definitions.len());
        for definition in definitions {
            registry
                .register_template_string(&definition.id, &definition.template)
                .map_err(|e| {
                    AppError::Prompt(format!(
                        "Failed to compile template {}: {}",
                        definition.id, e
                    ))
                })?;
            by_id.insert(definition.id.clone(), definition);
        }

        tracing::debug!(prompts = by_id.len(), "Prompt library loaded");

        Ok(Self {
            definitions: by_id,
            registry,
        })
    }

    /// Library with only the compiled-in definitions.
    pub fn builtin() -> AppResult<Self> {
        let definitions = BUILTIN_PROMPTS
            .iter()
            .map(|(id, contents)| crate::loader::parse_prompt(contents, id))
            .collect::<AppResult<Vec<_>>>()?;

        Self::from_definitions(definitions)
    }

    pub fn definition(&self, id: &str) -> Option<&PromptDefinition> {
        self.definitions.get(id)
    }

    /// Render prompt `id` with `variables`.
    pub fn render(&self, id: &str, variables: &HashMap<String, String>) -> AppResult<BuiltPrompt> {
        let definition = self
            .definitions
            .get(id)
            .ok_or_else(|| AppError::Prompt(format!("Prompt not found: {}", id)))?;

        let rendered = self
            .registry
            .render(id, variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render template {}: {}", id, e)))?;

        let built = BuiltPrompt::new(rendered, definition, variables);
        if !built.metadata.missing_variables.is_empty() {
            tracing::warn!(
                prompt = id,
                missing = ?built.metadata.missing_variables,
                "Rendering prompt with missing variables"
            );
        }

        Ok(built)
    }
}

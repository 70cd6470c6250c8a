//! Prompt rendering plus one generation call, shared by every LLM stage.

use ragline_core::config::GenerationConfig;
use ragline_core::AppResult;
use ragline_llm::{LlmClient, LlmRequest};
use ragline_prompt::PromptLibrary;
use std::collections::HashMap;
use std::sync::Arc;

/// Renders a named prompt and sends it to the generation provider.
#[derive(Clone)]
pub struct TextGenerator {
    client: Arc<dyn LlmClient>,
    prompts: Arc<PromptLibrary>,
    model: String,
    defaults: GenerationConfig,
}

impl TextGenerator {
    pub fn new(
        client: Arc<dyn LlmClient>,
        prompts: Arc<PromptLibrary>,
        model: impl Into<String>,
        defaults: GenerationConfig,
    ) -> Self {
        Self {
            client,
            prompts,
            model: model.into(),
            defaults,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    /// Render `prompt_id` with `variables` and return the trimmed completion.
    ///
    /// Sampling settings declared by the prompt win over the configured
    /// defaults.
    pub async fn generate(&self, prompt_id: &str, variables: &[(&str, &str)]) -> AppResult<String> {
        let vars: HashMap<String, String> = variables
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let built = self.prompts.render(prompt_id, &vars)?;

        let request = LlmRequest::new(built.user, &self.model)
            .with_temperature(built.behavior.temperature.unwrap_or(self.defaults.temperature))
            .with_max_tokens(built.behavior.max_tokens.unwrap_or(self.defaults.max_tokens));

        tracing::debug!(
            prompt = prompt_id,
            provider = self.client.provider_name(),
            "Generating"
        );

        let response = self.client.complete(&request).await?;
        Ok(response.content.trim().to_string())
    }
}

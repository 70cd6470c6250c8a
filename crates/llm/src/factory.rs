//! LLM provider factory.
//!
//! This module builds LLM clients from a provider name plus the endpoint and
//! secret resolved by `AppConfig`.

use crate::client::LlmClient;
use crate::providers::{OllamaClient, OpenAiClient};
use crate::throttle::{RateLimitedClient, Throttle};
use crate::types::ProviderType;
use ragline_core::{AppError, AppResult};
use std::sync::Arc;

/// Create an LLM client based on the provider name.
///
/// # Arguments
/// * `provider` - Provider identifier ("openai", "ollama")
/// * `endpoint` - Optional custom endpoint URL
/// * `api_key` - Optional API key (required by openai)
///
/// # Errors
/// Returns `AppError::Config` if the provider is unknown or a required
/// secret is missing.
pub fn create_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
) -> AppResult<Arc<dyn LlmClient>> {
    let provider_type = ProviderType::parse(provider)
        .ok_or_else(|| AppError::Config(format!("Unknown provider: {}", provider)))?;
    tracing::debug!(provider = provider_type.as_str(), ?endpoint, "Creating LLM client");

    match provider_type {
        ProviderType::Ollama => {
            let base_url = endpoint.unwrap_or("http://localhost:11434");
            Ok(Arc::new(OllamaClient::with_base_url(base_url)))
        }
        ProviderType::OpenAI => {
            let key = api_key
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| AppError::Config("OpenAI provider requires API key".to_string()))?;
            let client = match endpoint {
                Some(base_url) => OpenAiClient::with_base_url(base_url, key),
                None => OpenAiClient::new(key),
            };
            Ok(Arc::new(client))
        }
    }
}

/// Create a client whose calls are paced and retried by `throttle`.
pub fn create_throttled_client(
    provider: &str,
    endpoint: Option<&str>,
    api_key: Option<&str>,
    throttle: Arc<Throttle>,
) -> AppResult<Arc<dyn LlmClient>> {
    let inner = create_client(provider, endpoint, api_key)?;
    Ok(Arc::new(RateLimitedClient::new(inner, throttle)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama_client() {
        let client = create_client("ollama", None, None).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }

    #[test]
    fn test_create_ollama_with_custom_endpoint() {
        let client = create_client("ollama", Some("http://localhost:8080"), None);
        assert!(client.is_ok());
    }

    #[test]
    fn test_openai_requires_api_key() {
        match create_client("openai", None, None) {
            Err(AppError::Config(msg)) => assert!(msg.contains("requires API key")),
            Err(other) => panic!("Unexpected error: {}", other),
            Ok(_) => panic!("Expected error for OpenAI without API key"),
        }
    }

    #[test]
    fn test_openai_with_key() {
        let client = create_client("openai", None, Some("sk-test")).unwrap();
        assert_eq!(client.provider_name(), "openai");
    }

    #[test]
    fn test_unknown_provider() {
        assert!(matches!(
            create_client("unknown", None, None),
            Err(AppError::Config(_))
        ));
    }

    #[test]
    fn test_throttled_client_keeps_provider_name() {
        let client =
            create_throttled_client("ollama", None, None, Arc::new(Throttle::default())).unwrap();
        assert_eq!(client.provider_name(), "ollama");
    }
}

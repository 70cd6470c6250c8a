//! Web search fallback.

use ragline_core::config::WebSearchConfig;
use ragline_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};

const DEFAULT_TAVILY_URL: &str = "https://api.tavily.com";

/// One ranked snippet returned by a search provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub content: String,
}

/// Keyword search service used when local evidence is missing or rejected.
#[async_trait::async_trait]
pub trait WebSearchProvider: Send + Sync {
    fn provider_name(&self) -> &str;

    async fn search(&self, query: &str) -> AppResult<Vec<SearchResult>>;
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: usize,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

/// Tavily search API client.
pub struct TavilyClient {
    base_url: String,
    api_key: String,
    max_results: usize,
    client: reqwest::Client,
}

impl TavilyClient {
    pub fn new(api_key: impl Into<String>, max_results: usize) -> Self {
        Self::with_base_url(DEFAULT_TAVILY_URL, api_key, max_results)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        max_results: usize,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_results,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait::async_trait]
impl WebSearchProvider for TavilyClient {
    fn provider_name(&self) -> &str {
        "tavily"
    }

    async fn search(&self, query: &str) -> AppResult<Vec<SearchResult>> {
        let url = format!("{}/search", self.base_url);
        let request = TavilyRequest {
            api_key: &self.api_key,
            query,
            max_results: self.max_results,
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::WebSearch(format!("Failed to send request to Tavily: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::WebSearch(format!(
                "Tavily returned {}: {}",
                status, body
            )));
        }

        let body: TavilyResponse = response
            .json()
            .await
            .map_err(|e| AppError::WebSearch(format!("Failed to parse Tavily response: {}", e)))?;

        Ok(body.results)
    }
}

/// Build the configured search provider. `None` disables web search.
pub fn create_search_provider(
    config: &WebSearchConfig,
    api_key: Option<String>,
) -> AppResult<Option<Box<dyn WebSearchProvider>>> {
    let Some(api_key) = api_key.filter(|k| !k.trim().is_empty()) else {
        tracing::warn!(
            "{} is not set, web search fallback is disabled",
            config.api_key_env
        );
        return Ok(None);
    };

    match config.provider.as_str() {
        "tavily" => {
            let client = match &config.endpoint {
                Some(endpoint) => TavilyClient::with_base_url(endpoint, api_key, config.max_results),
                None => TavilyClient::new(api_key, config.max_results),
            };
            Ok(Some(Box::new(client)))
        }
        other => Err(AppError::Config(format!(
            "Unknown web search provider: '{}'. Supported providers: tavily",
            other
        ))),
    }
}

/// Render results as `source:`/`content:` blocks, skipping empty content.
pub fn format_results(results: &[SearchResult]) -> String {
    results
        .iter()
        .filter(|r| !r.content.trim().is_empty())
        .map(|r| format!("source: {}\ncontent: {}\n", r.url, r.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Search for `query`, returning formatted text or `""` when search is
/// disabled or fails.
pub async fn web_search(provider: Option<&dyn WebSearchProvider>, query: &str) -> String {
    let Some(provider) = provider else {
        tracing::info!("Web search not configured, continuing without it");
        return String::new();
    };

    match provider.search(query).await {
        Ok(results) => {
            tracing::debug!(
                provider = provider.provider_name(),
                results = results.len(),
                "Web search returned"
            );
            format_results(&results)
        }
        Err(e) => {
            tracing::warn!("Web search failed: {}", e);
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::support::ScriptedSearch;

    fn result(url: &str, content: &str) -> SearchResult {
        SearchResult {
            url: url.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn test_format_results_skips_empty_content() {
        let text = format_results(&[
            result("https://a.example", "Alpha facts."),
            result("https://b.example", "  "),
            result("https://c.example", "Gamma facts."),
        ]);
        assert_eq!(
            text,
            "source: https://a.example\ncontent: Alpha facts.\n\nsource: https://c.example\ncontent: Gamma facts.\n"
        );
    }

    #[test]
    fn test_tavily_response_tolerates_missing_fields() {
        let body: TavilyResponse =
            serde_json::from_str(r#"{"results":[{"url":"https://x","title":"t"}]}"#).unwrap();
        assert_eq!(body.results, vec![result("https://x", "")]);

        let body: TavilyResponse = serde_json::from_str("{}").unwrap();
        assert!(body.results.is_empty());
    }

    #[test]
    fn test_missing_key_disables_search() {
        let config = WebSearchConfig::default();
        assert!(create_search_provider(&config, None).unwrap().is_none());
        assert!(create_search_provider(&config, Some("  ".to_string()))
            .unwrap()
            .is_none());
        assert!(create_search_provider(&config, Some("tvly-key".to_string()))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_unknown_provider_is_config_error() {
        let config = WebSearchConfig {
            provider: "bing".to_string(),
            ..WebSearchConfig::default()
        };
        let result = create_search_provider(&config, Some("key".to_string()));
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[tokio::test]
    async fn test_web_search_fallbacks() {
        assert_eq!(web_search(None, "q").await, "");

        let failing = ScriptedSearch::failing();
        assert_eq!(web_search(Some(&failing), "q").await, "");

        let search = ScriptedSearch::new(vec![result("https://a", "Answer text")]);
        assert_eq!(
            web_search(Some(&search), "q").await,
            "source: https://a\ncontent: Answer text\n"
        );
        assert_eq!(search.queries(), vec!["q".to_string()]);
    }
}

//! Error types for Ragline.
//!
//! A single error enum covers every failure category the question-answering
//! pipeline distinguishes: configuration, provider throttling, provider
//! failures, corpus and search failures, prompt handling and input validation.

use thiserror::Error;

/// Unified error type for Ragline.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// A provider rejected the call because a rate limit or quota was hit
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Delay suggested by the provider, if it sent one
        retry_after_secs: Option<u64>,
    },

    /// Text-generation provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// Corpus store and embedding errors
    #[error("Knowledge error: {0}")]
    Knowledge(String),

    /// Web search provider errors
    #[error("Web search error: {0}")]
    WebSearch(String),

    /// Prompt definition errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// User input rejected before any processing
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Create a rate-limit error without a provider-suggested delay.
    pub fn rate_limited(message: impl Into<String>) -> Self {
        AppError::RateLimited {
            message: message.into(),
            retry_after_secs: None,
        }
    }

    /// Whether this error should be retried with backoff.
    pub fn is_throttled(&self) -> bool {
        matches!(self, AppError::RateLimited { .. })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

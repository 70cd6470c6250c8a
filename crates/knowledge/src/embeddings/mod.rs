//! Embedding providers for the corpus stores.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};

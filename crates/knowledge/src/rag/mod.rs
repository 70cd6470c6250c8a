//! Adaptive retrieval-and-answer pipeline.
//!
//! Questions are classified, refined and expanded, answered from the
//! persistent corpus and any attached document, checked for relevancy,
//! backed by web search when local evidence falls short, and returned as a
//! long and a short answer with provenance.

pub mod classify;
pub mod dedup;
pub mod engine;
pub mod generator;
pub mod refine;
pub mod relevancy;
pub mod rerank;
pub mod sources;
pub mod synthesize;
pub mod types;
pub mod web;

pub use engine::{Engine, CORPUS_COLLECTION, FLOW};
pub use generator::TextGenerator;
pub use types::{
    AnswerMethod, AttachedDocument, QaResponse, QueryInfo, QueryType, RunState, SourceTag, Stage,
};
pub use web::{create_search_provider, SearchResult, TavilyClient, WebSearchProvider};

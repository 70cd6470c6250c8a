//! Prompt system for Ragline.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions, built in and overridable per workspace
//! - Handlebars template rendering
//! - Per-prompt sampling overrides

pub mod builder;
pub mod loader;
pub mod types;

// Re-export main types
pub use builder::{build_prompt, PromptLibrary};
pub use loader::{list_prompts, load_prompt, prompts_dir};
pub use types::{BuiltPrompt, BuiltPromptMetadata, PromptBehavior, PromptDefinition, PromptInputSpec, PromptOutputSpec};

/// Identifiers of the prompts the question-answering pipeline renders.
pub mod ids {
    pub const CLASSIFY: &str = "qa.classify";
    pub const REFINE: &str = "qa.refine";
    pub const EXPAND: &str = "qa.expand";
    pub const RELEVANCY: &str = "qa.relevancy";
    pub const DIRECT: &str = "qa.direct";
    pub const LONG_ANSWER: &str = "qa.long_answer";
    pub const SHORT_ANSWER: &str = "qa.short_answer";
    pub const GENERAL_ANSWER: &str = "qa.general_answer";
}

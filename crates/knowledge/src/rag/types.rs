//! Question-answering request, response and run-state types.

use crate::types::CandidateDocument;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification label assigned to a question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Conversational,
    Factual,
    DocumentSpecific,
    /// Only reported by the top-level error fallback
    Fallback,
}

impl QueryType {
    /// Parse a classifier label. Matching is exact after trimming and
    /// lowercasing; `fallback` is never produced by parsing.
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "conversational" => Some(Self::Conversational),
            "factual" => Some(Self::Factual),
            "document_specific" => Some(Self::DocumentSpecific),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Conversational => "conversational",
            Self::Factual => "factual",
            Self::DocumentSpecific => "document_specific",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance tag recorded in `sources_used`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTag {
    DocumentRetrieval,
    WebSearch,
    AttachedDocument,
    DirectLlm,
    Fallback,
}

impl SourceTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DocumentRetrieval => "document_retrieval",
            Self::WebSearch => "web_search",
            Self::AttachedDocument => "attached_document",
            Self::DirectLlm => "direct_llm",
            Self::Fallback => "fallback",
        }
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerMethod {
    AdaptiveRag,
    ErrorFallback,
}

impl AnswerMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdaptiveRag => "adaptive_rag",
            Self::ErrorFallback => "error_fallback",
        }
    }
}

impl fmt::Display for AnswerMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text of a document supplied alongside one question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachedDocument {
    /// Display name (file name or `pasted_text`)
    pub name: String,
    pub text: String,
}

impl AttachedDocument {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// Provenance record returned with every answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryInfo {
    pub query_type: QueryType,
    pub refined_query: String,
    /// Never empty
    pub sources_used: Vec<SourceTag>,
    pub method: AnswerMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_name: Option<String>,
}

/// Answer returned for a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaResponse {
    pub long_answer: String,
    pub short_answer: String,
    pub query_info: QueryInfo,
}

/// Pipeline stages, in the order a run can visit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Classify,
    DirectAnswer,
    Refine,
    Expand,
    Retrieve,
    CheckRelevancy,
    WebSearch,
    SynthesizeLong,
    SynthesizeShort,
    Finalize,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classify => "classify",
            Self::DirectAnswer => "direct_answer",
            Self::Refine => "refine",
            Self::Expand => "expand",
            Self::Retrieve => "retrieve",
            Self::CheckRelevancy => "check_relevancy",
            Self::WebSearch => "web_search",
            Self::SynthesizeLong => "synthesize_long",
            Self::SynthesizeShort => "synthesize_short",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable record threaded through one run. Owned by that run only.
#[derive(Debug, Clone)]
pub struct RunState {
    pub question: String,
    pub document: Option<AttachedDocument>,
    pub query_type: QueryType,
    pub refined_query: String,
    /// At most 3, each non-empty
    pub expansions: Vec<String>,
    /// Deduplicated, then reranked
    pub candidates: Vec<CandidateDocument>,
    /// Gated context, capped in characters
    pub context: String,
    pub web_results: String,
    pub long_answer: String,
    pub short_answer: String,
    /// Whether the retrieval branch ran
    pub retrieval_attempted: bool,
}

impl RunState {
    pub fn new(question: impl Into<String>, document: Option<AttachedDocument>) -> Self {
        let question = question.into();
        Self {
            refined_query: question.clone(),
            question,
            document,
            query_type: QueryType::Factual,
            expansions: Vec::new(),
            candidates: Vec::new(),
            context: String::new(),
            web_results: String::new(),
            long_answer: String::new(),
            short_answer: String::new(),
            retrieval_attempted: false,
        }
    }

    /// Provenance for a finished run; falls back to `[fallback]`.
    pub fn sources_used(&self) -> Vec<SourceTag> {
        if self.query_type == QueryType::Conversational {
            return vec![SourceTag::DirectLlm];
        }

        let mut sources = Vec::new();
        if !self.context.is_empty() {
            sources.push(SourceTag::DocumentRetrieval);
        }
        if !self.web_results.is_empty() {
            sources.push(SourceTag::WebSearch);
        }
        if self.document.is_some() && self.retrieval_attempted {
            sources.push(SourceTag::AttachedDocument);
        }
        if sources.is_empty() {
            sources.push(SourceTag::Fallback);
        }
        sources
    }

    /// Assemble the response for a run that reached `Finalize`.
    pub fn into_response(self) -> QaResponse {
        let sources_used = self.sources_used();
        QaResponse {
            long_answer: self.long_answer,
            short_answer: self.short_answer,
            query_info: QueryInfo {
                query_type: self.query_type,
                refined_query: self.refined_query,
                sources_used,
                method: AnswerMethod::AdaptiveRag,
                document_name: self.document.map(|d| d.name),
            },
        }
    }
}

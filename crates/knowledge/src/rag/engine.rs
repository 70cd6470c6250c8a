//! Question-answering orchestrator.
//!
//! One [`Engine`] is built at startup and shared by reference. Each call to
//! [`Engine::ask`] owns a fresh [`RunState`] and walks it through the stage
//! machine:
//!
//! ```text
//! Classify ─┬─ conversational ─> DirectAnswer ──────────────────────────┐
//!           └─ otherwise ─> Refine ─> Expand ─> Retrieve                 │
//!                 Retrieve ─┬─ candidates ─> CheckRelevancy              │
//!                           └─ none ───────> WebSearch                   │
//!                 CheckRelevancy ─┬─ relevant ─> SynthesizeLong          │
//!                                 └─ rejected ─> WebSearch               │
//!                 WebSearch ─> SynthesizeLong ─> SynthesizeShort <───────┘
//!                 SynthesizeShort ─> Finalize
//! ```

use super::classify::classify;
use super::dedup::dedupe;
use super::generator::TextGenerator;
use super::refine::{expand, refine};
use super::relevancy::{char_prefix, is_relevant};
use super::rerank::rerank;
use super::sources::{build_document_store, retrieve, RetrievalSource};
use super::synthesize::{direct_answer, general_answer, long_answer, short_answer};
use super::types::{
    AnswerMethod, AttachedDocument, QaResponse, QueryInfo, QueryType, RunState, SourceTag, Stage,
};
use super::web::{create_search_provider, web_search, WebSearchProvider};
use crate::embeddings::{create_provider, EmbeddingProvider};
use crate::store::{SqliteStore, VectorStore};
use ragline_core::config::{AppConfig, RetrievalConfig};
use ragline_core::{AppError, AppResult};
use ragline_llm::{create_throttled_client, RetryPolicy, Throttle};
use ragline_prompt::PromptLibrary;
use std::sync::Arc;
use tracing::Instrument;

/// Name of the persistent corpus collection.
pub const CORPUS_COLLECTION: &str = "ragline_corpus";

/// Stage routing, as printed by `ragline flow`.
pub const FLOW: &[(&str, &str)] = &[
    ("classify", "conversational -> direct_answer, otherwise -> refine"),
    ("direct_answer", "-> synthesize_short"),
    ("refine", "-> expand"),
    ("expand", "-> retrieve"),
    ("retrieve", "candidates found -> check_relevancy, none -> web_search"),
    ("check_relevancy", "relevant -> synthesize_long, not relevant -> web_search"),
    ("web_search", "-> synthesize_long"),
    ("synthesize_long", "-> synthesize_short"),
    ("synthesize_short", "-> finalize"),
];

/// The adaptive retrieval-and-answer pipeline.
pub struct Engine {
    generator: TextGenerator,
    embedder: Arc<dyn EmbeddingProvider>,
    corpus: Option<Arc<dyn VectorStore>>,
    search: Option<Box<dyn WebSearchProvider>>,
    retrieval: RetrievalConfig,
}

impl Engine {
    pub fn new(
        generator: TextGenerator,
        embedder: Arc<dyn EmbeddingProvider>,
        retrieval: RetrievalConfig,
    ) -> Self {
        Self {
            generator,
            embedder,
            corpus: None,
            search: None,
            retrieval,
        }
    }

    /// Query `corpus` on every retrieval.
    pub fn with_corpus(mut self, corpus: Arc<dyn VectorStore>) -> Self {
        self.corpus = Some(corpus);
        self
    }

    /// Use `search` when local evidence is missing or rejected.
    pub fn with_search(mut self, search: Option<Box<dyn WebSearchProvider>>) -> Self {
        self.search = search;
        self
    }

    /// Wire every collaborator from configuration.
    ///
    /// Generation and remote embeddings share one throttle.
    pub fn from_config(config: &AppConfig) -> AppResult<Self> {
        let throttle = Arc::new(Throttle::new(RetryPolicy::from(&config.rate_limit)));

        let endpoint = config.resolve_endpoint(&config.provider);
        let api_key = config.resolve_api_key(&config.provider);
        let client = create_throttled_client(
            &config.provider,
            endpoint.as_deref(),
            api_key.as_deref(),
            throttle.clone(),
        )?;

        let prompts = Arc::new(PromptLibrary::load(&config.workspace)?);
        let generator =
            TextGenerator::new(client, prompts, &config.model, config.generation.clone());

        let embedder = create_provider(&config.embedding, throttle)?;
        let corpus = SqliteStore::open(&config.corpus_path(), CORPUS_COLLECTION, embedder.clone())?;

        let search = create_search_provider(&config.web_search, config.web_search_api_key())?;

        tracing::info!(
            provider = %config.provider,
            model = %config.model,
            embedding = %config.embedding.provider,
            web_search = search.is_some(),
            "Engine ready"
        );

        Ok(Self::new(generator, embedder, config.retrieval.clone())
            .with_corpus(Arc::new(corpus))
            .with_search(search))
    }

    /// Answer `question`, optionally grounded in an attached document.
    ///
    /// A blank question is rejected with `AppError::Validation`. Any other
    /// failure is absorbed into a general-knowledge answer tagged
    /// `error_fallback`.
    pub async fn ask(
        &self,
        question: &str,
        document: Option<AttachedDocument>,
    ) -> AppResult<QaResponse> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation("Question cannot be empty".to_string()));
        }

        let run_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!(
            "qa_run",
            run_id = %run_id,
            has_document = document.is_some()
        );

        async move {
            let document_name = document.as_ref().map(|d| d.name.clone());

            match self.run(RunState::new(question, document)).await {
                Ok(response) => {
                    tracing::info!(
                        query_type = %response.query_info.query_type,
                        sources = ?response.query_info.sources_used,
                        "Run finished"
                    );
                    Ok(response)
                }
                Err(e) => {
                    tracing::error!("Run failed, answering from general knowledge: {}", e);
                    Ok(self.error_fallback(question, document_name).await)
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, mut state: RunState) -> AppResult<QaResponse> {
        let mut stage = Stage::Classify;

        loop {
            tracing::debug!(stage = %stage, "Entering stage");
            stage = match stage {
                Stage::Classify => {
                    state.query_type = classify(&self.generator, &state.question).await;
                    tracing::debug!(query_type = %state.query_type, "Classified");
                    if state.query_type == QueryType::Conversational {
                        Stage::DirectAnswer
                    } else {
                        Stage::Refine
                    }
                }

                Stage::DirectAnswer => {
                    state.long_answer = direct_answer(&self.generator, &state.question).await;
                    Stage::SynthesizeShort
                }

                Stage::Refine => {
                    state.refined_query = refine(&self.generator, &state.question).await;
                    Stage::Expand
                }

                Stage::Expand => {
                    state.expansions = expand(&self.generator, &state.refined_query).await;
                    Stage::Retrieve
                }

                Stage::Retrieve => {
                    state.retrieval_attempted = true;
                    state.candidates = self.retrieve(&state).await?;
                    if state.candidates.is_empty() {
                        Stage::WebSearch
                    } else {
                        Stage::CheckRelevancy
                    }
                }

                Stage::CheckRelevancy => {
                    let joined = state
                        .candidates
                        .iter()
                        .map(|c| c.content.as_str())
                        .collect::<Vec<_>>()
                        .join("\n\n");

                    if is_relevant(
                        &self.generator,
                        &state.refined_query,
                        &joined,
                        self.retrieval.relevancy_prefix_chars,
                    )
                    .await
                    {
                        state.context =
                            char_prefix(&joined, self.retrieval.context_cap_chars).to_string();
                        Stage::SynthesizeLong
                    } else {
                        tracing::info!("Retrieved context rejected, escalating to web search");
                        state.context.clear();
                        Stage::WebSearch
                    }
                }

                Stage::WebSearch => {
                    state.web_results =
                        web_search(self.search.as_deref(), &state.refined_query).await;
                    Stage::SynthesizeLong
                }

                Stage::SynthesizeLong => {
                    state.long_answer = long_answer(
                        &self.generator,
                        &state.refined_query,
                        &state.context,
                        &state.web_results,
                    )
                    .await;
                    Stage::SynthesizeShort
                }

                Stage::SynthesizeShort => {
                    state.short_answer =
                        short_answer(&self.generator, &state.question, &state.long_answer).await;
                    Stage::Finalize
                }

                Stage::Finalize => break,
            };
        }

        Ok(state.into_response())
    }

    /// Retrieve, deduplicate and rerank candidates for the run's queries.
    ///
    /// A failure to index the attached document is returned as an error.
    async fn retrieve(&self, state: &RunState) -> AppResult<Vec<crate::types::CandidateDocument>> {
        let mut queries = Vec::with_capacity(1 + state.expansions.len());
        queries.push(state.refined_query.clone());
        queries.extend(state.expansions.iter().cloned());

        let mut sources = Vec::with_capacity(2);
        if let Some(corpus) = &self.corpus {
            sources.push(RetrievalSource::new(
                corpus.clone(),
                self.retrieval.persistent_results,
            ));
        }
        if let Some(document) = &state.document {
            let store =
                build_document_store(document, self.embedder.clone(), &self.retrieval).await?;
            sources.push(RetrievalSource::new(
                Arc::new(store),
                self.retrieval.document_results,
            ));
        }

        let retrieved = retrieve(&sources, &queries).await;
        let retrieved_count = retrieved.len();
        let unique = dedupe(retrieved);
        let ranked = rerank(unique, &state.refined_query, self.retrieval.rerank_top_k);

        tracing::debug!(
            queries = queries.len(),
            retrieved = retrieved_count,
            kept = ranked.len(),
            "Retrieval finished"
        );
        Ok(ranked)
    }

    async fn error_fallback(&self, question: &str, document_name: Option<String>) -> QaResponse {
        let answer = general_answer(&self.generator, question).await;
        QaResponse {
            long_answer: answer.clone(),
            short_answer: answer,
            query_info: QueryInfo {
                query_type: QueryType::Fallback,
                refined_query: question.to_string(),
                sources_used: vec![SourceTag::Fallback],
                method: AnswerMethod::ErrorFallback,
                document_name,
            },
        }
    }
}

//! In-process collaborators for pipeline tests.

use crate::embeddings::providers::TrigramProvider;
use crate::embeddings::EmbeddingProvider;
use crate::rag::web::{SearchResult, WebSearchProvider};
use crate::rag::{Engine, TextGenerator};
use crate::store::{MemoryStore, QueryResult, VectorStore};
use crate::types::Metadata;
use ragline_core::config::{GenerationConfig, RetrievalConfig};
use ragline_core::{AppError, AppResult};
use ragline_llm::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
use ragline_prompt::PromptLibrary;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// Text unique to each built-in prompt template.
pub const CLASSIFY: &str = "Sort the question below into exactly one category";
pub const REFINE: &str = "Rewrite the question so it is precise";
pub const EXPAND: &str = "Write 3 broader questions";
pub const RELEVANCY: &str = "Decide whether the context below helps";
pub const DIRECT: &str = "You are a friendly assistant";
pub const LONG: &str = "Answer the question using the context below";
pub const GENERAL: &str = "from general knowledge";
pub const SHORT: &str = "Condense the answer below";

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Fail,
}

/// LLM that answers by matching a needle in the rendered prompt.
///
/// Prompts without a scripted reply fail with `AppError::Llm`.
#[derive(Debug, Default)]
pub struct ScriptedLlm {
    rules: Vec<(&'static str, Reply)>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, needle: &'static str, reply: impl Into<String>) -> Self {
        self.rules.push((needle, Reply::Text(reply.into())));
        self
    }

    pub fn fail(mut self, needle: &'static str) -> Self {
        self.rules.push((needle, Reply::Fail));
        self
    }

    pub fn on_classify(self, reply: &str) -> Self {
        self.on(CLASSIFY, reply)
    }
    pub fn on_refine(self, reply: &str) -> Self {
        self.on(REFINE, reply)
    }
    pub fn on_expand(self, reply: &str) -> Self {
        self.on(EXPAND, reply)
    }
    pub fn on_relevancy(self, reply: &str) -> Self {
        self.on(RELEVANCY, reply)
    }
    pub fn on_direct(self, reply: &str) -> Self {
        self.on(DIRECT, reply)
    }
    pub fn on_long(self, reply: &str) -> Self {
        self.on(LONG, reply)
    }
    pub fn on_general(self, reply: &str) -> Self {
        self.on(GENERAL, reply)
    }
    pub fn on_short(self, reply: &str) -> Self {
        self.on(SHORT, reply)
    }

    pub fn fail_classify(self) -> Self {
        self.fail(CLASSIFY)
    }
    pub fn fail_refine(self) -> Self {
        self.fail(REFINE)
    }
    pub fn fail_expand(self) -> Self {
        self.fail(EXPAND)
    }
    pub fn fail_relevancy(self) -> Self {
        self.fail(RELEVANCY)
    }
    pub fn fail_direct(self) -> Self {
        self.fail(DIRECT)
    }
    pub fn fail_long(self) -> Self {
        self.fail(LONG)
    }
    pub fn fail_general(self) -> Self {
        self.fail(GENERAL)
    }
    pub fn fail_short(self) -> Self {
        self.fail(SHORT)
    }

    /// Every request received so far, oldest first.
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of requests whose prompt contains `needle`.
    pub fn calls_to(&self, needle: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.prompt.contains(needle))
            .count()
    }
}

#[async_trait::async_trait]
impl LlmClient for ScriptedLlm {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &LlmRequest) -> AppResult<LlmResponse> {
        self.requests.lock().unwrap().push(request.clone());

        let reply = self
            .rules
            .iter()
            .find(|(needle, _)| request.prompt.contains(needle))
            .map(|(_, reply)| reply.clone());

        match reply {
            Some(Reply::Text(content)) => Ok(LlmResponse {
                content,
                model: request.model.clone(),
                usage: LlmUsage::default(),
            }),
            Some(Reply::Fail) => Err(AppError::Llm("scripted failure".to_string())),
            None => Err(AppError::Llm("no scripted reply".to_string())),
        }
    }
}

pub fn generator_from(llm: Arc<ScriptedLlm>) -> TextGenerator {
    TextGenerator::new(
        llm,
        Arc::new(PromptLibrary::builtin().unwrap()),
        "test-model",
        GenerationConfig::default(),
    )
}

pub fn generator(llm: ScriptedLlm) -> TextGenerator {
    generator_from(Arc::new(llm))
}

/// Search provider returning fixed results and recording queries.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSearch {
    results: Vec<SearchResult>,
    failing: bool,
    queries: Arc<Mutex<Vec<String>>>,
}

impl ScriptedSearch {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl WebSearchProvider for ScriptedSearch {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    async fn search(&self, query: &str) -> AppResult<Vec<SearchResult>> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.failing {
            return Err(AppError::WebSearch("scripted outage".to_string()));
        }
        Ok(self.results.clone())
    }
}

/// Store wrapper counting queries.
pub struct CountingStore {
    inner: MemoryStore,
    queries: AtomicUsize,
}

impl CountingStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            queries: AtomicUsize::new(0),
        }
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl VectorStore for CountingStore {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn location(&self) -> String {
        self.inner.location()
    }

    async fn add(&self, ids: &[String], texts: &[String], metadatas: &[Metadata]) -> AppResult<()> {
        self.inner.add(ids, texts, metadatas).await
    }

    async fn query(&self, text: &str, k: usize) -> AppResult<QueryResult> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        self.inner.query(text, k).await
    }

    async fn count(&self) -> AppResult<usize> {
        self.inner.count().await
    }

    async fn reset(&self) -> AppResult<()> {
        self.inner.reset().await
    }
}

/// Embedder that loses the last vector of every batch.
#[derive(Debug)]
pub struct LossyEmbedder {
    inner: TrigramProvider,
}

impl LossyEmbedder {
    pub fn new() -> Self {
        Self {
            inner: TrigramProvider::new(128),
        }
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for LossyEmbedder {
    fn provider_name(&self) -> &str {
        "lossy"
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut embeddings = self.inner.embed_batch(texts).await?;
        embeddings.pop();
        Ok(embeddings)
    }
}

pub fn embedder() -> Arc<dyn EmbeddingProvider> {
    Arc::new(TrigramProvider::new(256))
}

/// Persistent-style store holding `passages`, each with a `chunk_id`.
pub async fn corpus_with(passages: &[&str]) -> Arc<CountingStore> {
    let store = MemoryStore::new("persistent", embedder());
    let ids: Vec<String> = (0..passages.len()).map(|i| format!("corpus_{}", i)).collect();
    let texts: Vec<String> = passages.iter().map(|p| p.to_string()).collect();
    let metadatas: Vec<Metadata> = ids
        .iter()
        .map(|id| {
            let mut metadata = Metadata::new();
            metadata.insert("source".to_string(), "persistent".into());
            metadata.insert("chunk_id".to_string(), id.clone().into());
            metadata
        })
        .collect();
    store.add(&ids, &texts, &metadatas).await.unwrap();
    Arc::new(CountingStore::new(store))
}

pub fn engine(
    llm: Arc<ScriptedLlm>,
    corpus: Option<Arc<dyn VectorStore>>,
    search: Option<ScriptedSearch>,
) -> Engine {
    let mut engine = Engine::new(generator_from(llm), embedder(), RetrievalConfig::default())
        .with_search(search.map(|s| Box::new(s) as Box<dyn WebSearchProvider>));
    if let Some(corpus) = corpus {
        engine = engine.with_corpus(corpus);
    }
    engine
}

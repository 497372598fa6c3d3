//! Chat engine: retrieval, prompt assembly, generation, session turns
//!
//! Each turn walks an explicit state machine:
//! `Idle -> Retrieving -> Generating -> Idle`, or `Failed` when a provider
//! call gives up. Failure is terminal for the turn only; the session stays
//! usable and its history is untouched, so the caller may retry the same
//! query cleanly.

use std::collections::HashMap;
use std::env;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tcm_core::{DocumentLookup, EmbeddingProvider, Error, GenerationProvider, Result};
use tcm_index::{IndexSnapshot, Retriever, RetrieverConfig};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::prompt::PromptBuilder;
use crate::session::{Session, TurnPhase};

/// Answer returned when retrieval finds nothing above the similarity
/// floor. A fixed refusal beats an unguided completion in a medical
/// domain.
pub const NO_INFORMATION_ANSWER: &str =
    "根据现有资料无法回答该问题，请换一种问法或补充症状描述。";

/// Engine settings, overridable from the environment
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Retrieval breadth per query
    pub top_k: usize,
    /// Optional similarity floor for retrieval hits
    pub min_score: Option<f32>,
    /// Character budget for the retrieved-context block
    pub max_context_chars: usize,
    /// History entries retained per session (sliding window)
    pub history_window: usize,
    /// Retries on transient provider failures, per remote call
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries
    pub retry_backoff: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            min_score: None,
            max_context_chars: 3000,
            history_window: 8,
            max_retries: 2,
            retry_backoff: Duration::from_millis(500),
        }
    }
}

impl EngineConfig {
    /// Defaults with optional environment overrides
    pub fn from_env() -> Self {
        fn parse<T: std::str::FromStr>(name: &str) -> Option<T> {
            env::var(name).ok().and_then(|v| v.parse().ok())
        }

        let mut config = Self::default();
        if let Some(v) = parse("TCM_TOP_K") {
            config.top_k = v;
        }
        if let Some(v) = parse("TCM_MAX_CONTEXT_CHARS") {
            config.max_context_chars = v;
        }
        if let Some(v) = parse("TCM_HISTORY_WINDOW") {
            config.history_window = v;
        }
        if let Some(v) = parse("TCM_MAX_RETRIES") {
            config.max_retries = v;
        }
        if let Some(v) = parse("TCM_MIN_SCORE") {
            config.min_score = Some(v);
        }
        config
    }
}

/// Structured turn failure handed to the external caller.
/// Serializes as `{"error": ..., "detail": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnError {
    pub error: String,
    pub detail: String,
}

impl From<Error> for TurnError {
    fn from(e: Error) -> Self {
        Self {
            error: e.kind().to_string(),
            detail: e.to_string(),
        }
    }
}

impl std::fmt::Display for TurnError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.error, self.detail)
    }
}

/// Result of one `ask` turn
pub type AskResult = std::result::Result<String, TurnError>;

/// The chat engine. Owns all sessions; shares the read-only index
/// snapshot with concurrent turns. One in-flight turn per session is
/// enforced with a per-session async mutex; different sessions proceed
/// in parallel.
pub struct ChatEngine<E: EmbeddingProvider, G: GenerationProvider> {
    snapshot: Arc<IndexSnapshot>,
    embedder: Arc<E>,
    generator: Arc<G>,
    retriever: Retriever,
    prompt: PromptBuilder,
    config: EngineConfig,
    sessions: Mutex<HashMap<String, Arc<AsyncMutex<Session>>>>,
}

impl<E: EmbeddingProvider, G: GenerationProvider> ChatEngine<E, G> {
    pub fn new(
        snapshot: Arc<IndexSnapshot>,
        embedder: Arc<E>,
        generator: Arc<G>,
        config: EngineConfig,
    ) -> Self {
        let retriever = Retriever::new(RetrieverConfig {
            top_k: config.top_k,
            min_score: config.min_score,
        });
        let prompt = PromptBuilder::new(config.max_context_chars);
        Self {
            snapshot,
            embedder,
            generator,
            retriever,
            prompt,
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Answer one query within the given session.
    ///
    /// On success the session history gains the `(user, query)` and
    /// `(assistant, answer)` entries. On failure the structured error is
    /// returned and history is left exactly as it was.
    pub async fn ask(&self, session_id: &str, query: &str) -> AskResult {
        let handle = self.session_handle(session_id);
        // Serializes turns within this session; other sessions are
        // unaffected. Dropped on cancellation, freeing the session.
        let mut session = handle.lock().await;

        session.set_phase(TurnPhase::Retrieving);
        match self.run_turn(&mut session, query).await {
            Ok(answer) => {
                session.record_exchange(query, &answer, self.config.history_window);
                session.set_phase(TurnPhase::Idle);
                info!(session = %session.id, history = session.len(), "turn complete");
                Ok(answer)
            }
            Err(Error::EmptyResult) => {
                // Open-question policy: refuse honestly instead of
                // generating without grounding. The exchange still
                // becomes part of the conversation.
                let answer = NO_INFORMATION_ANSWER.to_string();
                session.record_exchange(query, &answer, self.config.history_window);
                session.set_phase(TurnPhase::Idle);
                info!(session = %session.id, "no relevant chunks, returned fallback answer");
                Ok(answer)
            }
            Err(e) => {
                session.set_phase(TurnPhase::Failed);
                warn!(session = %session.id, error = %e, "turn failed");
                Err(TurnError::from(e))
            }
        }
    }

    /// Drop a session's state entirely
    pub fn reset_session(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        if sessions.remove(session_id).is_some() {
            info!(session = session_id, "session reset");
        }
    }

    /// Number of live sessions
    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub(crate) fn session_handle(&self, session_id: &str) -> Arc<AsyncMutex<Session>> {
        let mut sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(Session::new(session_id))))
            .clone()
    }

    async fn run_turn(&self, session: &mut Session, query: &str) -> Result<String> {
        let embedding = self.embed_with_retry(query).await?;
        let hits = self.retriever.retrieve(&self.snapshot.vectors, &embedding)?;
        debug!(session = %session.id, hits = hits.len(), "retrieved context chunks");

        // A miss here means the snapshot broke its 1:1 invariant; that is
        // fatal for the turn, not something to paper over.
        let mut chunk_texts = Vec::with_capacity(hits.len());
        for hit in &hits {
            chunk_texts.push(self.snapshot.documents.get_text(&hit.chunk_id)?);
        }

        session.set_phase(TurnPhase::Generating);
        let history: Vec<_> = session.turns().collect();
        let prompt = self.prompt.build(&chunk_texts, &history, query);
        self.generate_with_retry(&prompt).await
    }

    async fn embed_with_retry(&self, text: &str) -> Result<Vec<f32>> {
        let mut attempt = 0;
        loop {
            match self.embedder.embed(text).await {
                Ok(v) => return Ok(v),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_backoff * 2u32.pow(attempt);
                    warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "retrying embed");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn generate_with_retry(&self, prompt: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.generator.generate(prompt).await {
                Ok(answer) => return Ok(answer),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    let delay = self.config.retry_backoff * 2u32.pow(attempt);
                    warn!(error = %e, attempt, delay_ms = delay.as_millis() as u64, "retrying generate");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

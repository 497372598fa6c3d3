//! Chat engine and session management for the TCM assistant
//!
//! Exposes the `ask(session_id, query)` entry point consumed by whatever
//! front end drives the assistant, plus session reset. Retrieval, prompt
//! assembly, generation, and history live here; the persisted index and
//! the hosted-model adapters come from `tcm-index` and `tcm-dashscope`.

mod engine;
mod prompt;
mod session;


pub use engine::{AskResult, ChatEngine, EngineConfig, TurnError, NO_INFORMATION_ANSWER};
pub use prompt::PromptBuilder;
pub use session::{Role, Session, Turn, TurnPhase};

// Re-export core types for convenience
pub use tcm_core::{EmbeddingProvider, Error, GenerationProvider, Result};

//! Core traits and types for the TCM question answering assistant
//!
//! This crate defines the fundamental traits and types used across the
//! workspace: the error taxonomy, chunk types, the provider traits for the
//! hosted embedding/generation models, and the store traits the persisted
//! index exposes to the chat engine. Keeping the interfaces here makes the
//! system test-friendly: the engine is exercised against stub providers
//! and in-memory stores.

pub mod chunk;
pub mod error;
pub mod provider;
pub mod store;

pub use chunk::{Chunk, ChunkMetadata, ScoredChunk};
pub use error::{Error, Result};
pub use provider::{EmbeddingProvider, GenerationProvider};
pub use store::{DocumentLookup, VectorSearch};

//! DashScope (Qwen) integration for the TCM assistant
//!
//! Provides the hosted embedding and generation adapters behind the
//! `tcm-core` provider traits.

mod client;
mod config;


pub use client::DashScopeClient;
pub use config::DashScopeConfig;

// Re-export core types for convenience
pub use tcm_core::{EmbeddingProvider, Error, GenerationProvider, Result};

//! Provider traits for the hosted embedding and generation models
//!
//! Both adapters are stateless request/response calls. They perform no
//! caching and no retries; retry policy belongs to the chat engine, which
//! inspects `Error::is_retryable` on failures.

use async_trait::async_trait;

use crate::Result;

/// Converts text into a fixed-dimension embedding vector via a remote call
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed one text. The returned vector has the provider's fixed
    /// dimension; all vectors in one index come from the same provider.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embedding dimension produced by this provider
    fn dimension(&self) -> usize;
}

/// Turns an assembled prompt into a natural-language completion
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String>;
}

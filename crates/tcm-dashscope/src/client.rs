//! DashScope REST client implementing the provider traits
//!
//! Both operations are stateless request/response calls authenticated
//! with a bearer API key. Failures map to `Error::Provider { status,
//! message }`; status 0 means the request produced no HTTP response
//! (connect failure or timeout), which is the only class the chat engine
//! treats as retryable. The client itself performs no caching and no
//! retries.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tcm_core::{EmbeddingProvider, Error, GenerationProvider, Result};
use tracing::debug;

use crate::config::DashScopeConfig;

/// DashScope (Qwen) client
pub struct DashScopeClient {
    config: DashScopeConfig,
    client: Client,
}

#[derive(Serialize)]
struct GenerationRequest {
    model: String,
    input: GenerationInput,
    parameters: GenerationParams,
}

#[derive(Serialize)]
struct GenerationInput {
    prompt: String,
}

#[derive(Serialize)]
struct GenerationParams {
    temperature: f32,
    max_tokens: u32,
    result_format: String,
}

#[derive(Deserialize)]
struct GenerationResponse {
    output: GenerationOutput,
}

#[derive(Deserialize)]
struct GenerationOutput {
    text: String,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: EmbeddingInput,
}

#[derive(Serialize)]
struct EmbeddingInput {
    texts: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    output: EmbeddingOutput,
}

#[derive(Deserialize)]
struct EmbeddingOutput {
    embeddings: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl DashScopeClient {
    /// Model constants
    pub const QWEN_MAX: &'static str = "qwen-max";
    pub const QWEN_PLUS: &'static str = "qwen-plus";
    pub const TEXT_EMBEDDING_V1: &'static str = "text-embedding-v1";

    /// Create a new DashScope client from configuration
    pub fn new(config: DashScopeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Provider { status: 0, message: e.to_string() })?;

        Ok(Self { config, client })
    }

    /// Create a new DashScope client from environment variables
    pub fn from_env() -> Result<Self> {
        let config = DashScopeConfig::from_env()?;
        Self::new(config)
    }

    async fn post_json<Req: Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp> {
        let url = format!("{}{}", self.config.api_url, path);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(body)
            .send()
            .await
            .map_err(|e| Error::Provider { status: 0, message: e.to_string() })?;

        let status = response.status();
        if !status.is_success() {
            let detail = match response.json::<ApiErrorBody>().await {
                Ok(err) if !err.message.is_empty() => format!("{}: {}", err.code, err.message),
                _ => format!("request to {} failed", path),
            };
            return Err(Error::Provider { status: status.as_u16(), message: detail });
        }

        response
            .json::<Resp>()
            .await
            .map_err(|e| Error::Provider {
                status: status.as_u16(),
                message: format!("malformed response body: {}", e),
            })
    }
}

#[async_trait]
impl EmbeddingProvider for DashScopeClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: self.config.embedding_model.clone(),
            input: EmbeddingInput { texts: vec![text.to_string()] },
        };

        let response: EmbeddingResponse = self
            .post_json("/api/v1/services/embeddings/text-embedding/text-embedding", &request)
            .await?;

        let embedding = response
            .output
            .embeddings
            .into_iter()
            .next()
            .map(|item| item.embedding)
            .ok_or_else(|| Error::Provider {
                status: 200,
                message: "embedding response contained no vectors".to_string(),
            })?;

        debug!(model = %self.config.embedding_model, dim = embedding.len(), "embedded text");
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.config.embedding_dimension
    }
}

#[async_trait]
impl GenerationProvider for DashScopeClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        let request = GenerationRequest {
            model: self.config.generation_model.clone(),
            input: GenerationInput { prompt: prompt.to_string() },
            parameters: GenerationParams {
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
                result_format: "text".to_string(),
            },
        };

        let response: GenerationResponse = self
            .post_json("/api/v1/services/aigc/text-generation/generation", &request)
            .await?;

        let answer = response.output.text.trim().to_string();
        if answer.is_empty() {
            return Err(Error::Provider {
                status: 200,
                message: "generation response was empty".to_string(),
            });
        }

        debug!(model = %self.config.generation_model, chars = answer.len(), "generated completion");
        Ok(answer)
    }
}

//! DashScope configuration

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tcm_core::{Error, Result};

/// Configuration for the DashScope client.
///
/// The API credential is read once from the environment at startup and
/// injected explicitly; nothing reads it ad hoc later.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashScopeConfig {
    pub api_key: String,
    pub api_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    /// Dimension of vectors produced by `embedding_model`
    pub embedding_dimension: usize,
    pub temperature: f32,
    pub max_tokens: u32,
    #[serde(with = "duration_secs")]
    pub request_timeout: Duration,
}

impl DashScopeConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("DASHSCOPE_API_KEY").map_err(|_| {
            Error::Configuration(
                "DASHSCOPE_API_KEY environment variable not found".to_string(),
            )
        })?;

        let api_url = env::var("DASHSCOPE_API_URL")
            .unwrap_or_else(|_| "https://dashscope.aliyuncs.com".to_string());

        let request_timeout = env::var("TCM_REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        Ok(Self {
            request_timeout,
            ..Self::new(api_key, api_url)
        })
    }

    /// Create configuration with explicit values
    pub fn new(api_key: String, api_url: String) -> Self {
        Self {
            api_key,
            api_url,
            generation_model: crate::DashScopeClient::QWEN_MAX.to_string(),
            embedding_model: crate::DashScopeClient::TEXT_EMBEDDING_V1.to_string(),
            embedding_dimension: 1536,
            temperature: 0.0,
            max_tokens: 2048,
            request_timeout: Duration::from_secs(30),
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

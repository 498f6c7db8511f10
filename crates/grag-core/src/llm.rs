//! Chat and embedding provider traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Result;

/// Tuning parameters for a single completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Ask the provider for a JSON object response
    pub json_mode: bool,
    #[serde(skip)]
    pub timeout: Duration,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            model_id: String::new(),
            max_tokens: 2000,
            temperature: 0.0,
            json_mode: false,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Result of a single completion call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResult {
    pub text: String,
    pub model_id: String,
    /// Prompt tokens as reported by the provider, 0 when unreported
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// Trait for chat completion providers
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Run a single system+user completion
    async fn complete(
        &self,
        system: &str,
        user: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult>;

    /// The model this provider targets by default
    fn model_id(&self) -> &str;
}

/// Trait for text embedding providers
#[async_trait]
pub trait TextEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    fn model_id(&self) -> &str;
}

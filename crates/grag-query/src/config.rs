//! OpenAI-compatible API configuration

use serde::{Deserialize, Serialize};
use std::env;

use grag_core::{Error, Result};

/// Configuration for an OpenAI-compatible chat/embedding API
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub api_base: String,
    pub model_id: String,
    pub embedding_model_id: String,
}

impl OpenAiConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let api_key = env::var("GRAPHRAG_API_KEY")
            .or_else(|_| env::var("API_KEY"))
            .map_err(|_| {
                Error::Configuration(
                    "GRAPHRAG_API_KEY or API_KEY environment variable not found".to_string(),
                )
            })?;

        let api_base = env::var("API_BASE")
            .unwrap_or_else(|_| "https://open.bigmodel.cn/api/paas/v4/".to_string());

        let model_id = env::var("MODEL_ID").unwrap_or_else(|_| "glm-4".to_string());

        let embedding_model_id =
            env::var("EMBEDDING_MODEL_ID").unwrap_or_else(|_| "embedding-3".to_string());

        Ok(Self {
            api_key,
            api_base,
            model_id,
            embedding_model_id,
        })
    }

    /// Create configuration with explicit values
    pub fn new(api_key: String, api_base: String, model_id: String) -> Self {
        Self {
            api_key,
            api_base,
            model_id,
            embedding_model_id: "embedding-3".to_string(),
        }
    }

    pub fn with_embedding_model(mut self, model_id: impl Into<String>) -> Self {
        self.embedding_model_id = model_id.into();
        self
    }

    /// Endpoint URL under the API base
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base.trim_end_matches('/'), path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_join() {
        let config = OpenAiConfig::new(
            "key".to_string(),
            "https://open.bigmodel.cn/api/paas/v4/".to_string(),
            "glm-4".to_string(),
        );
        assert_eq!(
            config.endpoint("chat/completions"),
            "https://open.bigmodel.cn/api/paas/v4/chat/completions"
        );

        let no_slash = OpenAiConfig::new(
            "key".to_string(),
            "https://api.example.com/v1".to_string(),
            "glm-4".to_string(),
        );
        assert_eq!(
            no_slash.endpoint("embeddings"),
            "https://api.example.com/v1/embeddings"
        );
    }
}

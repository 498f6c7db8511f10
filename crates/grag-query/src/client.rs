//! OpenAI-compatible chat and embedding clients

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::timeout;

use crate::OpenAiConfig;
use grag_core::{
    ChatProvider, Error, GenerationConfig, GenerationResult, Result, TextEmbedder,
};

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Default)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

/// Chat completion client for an OpenAI-compatible API
pub struct ChatClient {
    config: OpenAiConfig,
    client: Client,
    max_retries: u32,
}

impl ChatClient {
    /// Create a client; `max_retries` is the retry budget for transport
    /// failures
    pub fn new(config: OpenAiConfig, max_retries: u32) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self {
            config,
            client,
            max_retries: max_retries.max(1),
        })
    }

    /// Client with the default retry budget of 20
    pub fn with_defaults(config: OpenAiConfig) -> Result<Self> {
        Self::new(config, 20)
    }

    async fn perform_completion(
        &self,
        system: &str,
        user: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let model = if config.model_id.is_empty() {
            self.config.model_id.clone()
        } else {
            config.model_id.clone()
        };

        let request_body = ChatRequest {
            model: model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: user.to_string(),
                },
            ],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            response_format: config.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::LlmProvider(format!(
                "chat request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| Error::LlmProvider("empty response from chat API".to_string()))?;

        let usage = parsed.usage.unwrap_or_default();

        Ok(GenerationResult {
            text,
            model_id: model,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
        })
    }
}

#[async_trait]
impl ChatProvider for ChatClient {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        config: &GenerationConfig,
    ) -> Result<GenerationResult> {
        let mut last_err = None;
        for _ in 0..self.max_retries {
            let call = self.perform_completion(system, user, config);
            match timeout(config.timeout, call).await {
                Ok(Ok(result)) => return Ok(result),
                // transport errors are retried, API errors are not
                Ok(Err(Error::Network(e))) => last_err = Some(Error::Network(e)),
                Ok(Err(e)) => return Err(e),
                Err(_) => last_err = Some(Error::Timeout("chat request timed out".to_string())),
            }
        }
        Err(last_err
            .unwrap_or_else(|| Error::LlmProvider("all completion attempts failed".to_string())))
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }
}

/// Embedding client for an OpenAI-compatible API
pub struct EmbeddingClient {
    config: OpenAiConfig,
    client: Client,
}

impl EmbeddingClient {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| Error::Network(e.to_string()))?;

        Ok(Self { config, client })
    }
}

#[async_trait]
impl TextEmbedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request_body = EmbeddingRequest {
            model: self.config.embedding_model_id.clone(),
            input: vec![text.to_string()],
        };

        let response = self
            .client
            .post(self.config.endpoint("embeddings"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request_body)
            .send()
            .await
            .map_err(|e| Error::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::LlmProvider(format!(
                "embedding request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| Error::Serialization(e.to_string()))?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| Error::LlmProvider("empty response from embedding API".to_string()))
    }

    fn model_id(&self) -> &str {
        &self.config.embedding_model_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "glm-4".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: "ctx".to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: "q".to_string(),
                },
            ],
            max_tokens: 1000,
            temperature: 0.0,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "glm-4");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["response_format"]["type"], "json_object");
    }

    #[test]
    fn test_response_format_omitted_when_absent() {
        let request = ChatRequest {
            model: "glm-4".to_string(),
            messages: vec![],
            max_tokens: 2000,
            temperature: 0.0,
            response_format: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("response_format").is_none());
    }

    #[test]
    fn test_chat_response_parse() {
        let body = r#"{
            "choices": [{"message": {"role": "assistant", "content": "hello"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(body).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("hello")
        );
        assert_eq!(parsed.usage.unwrap().prompt_tokens, 12);
    }
}

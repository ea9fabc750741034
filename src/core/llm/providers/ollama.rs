//! Ollama Provider Implementation
//!
//! Local LLM provider using Ollama for running models locally.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

use crate::core::llm::error::{LLMError, Result};
use crate::core::llm::provider::LLMProvider;
use crate::core::llm::types::{ChatRequest, ChatResponse, TokenUsage};

/// Ollama provider for local LLM inference
pub struct OllamaProvider {
    host: String,
    model: String,
    client: Client,
}

impl OllamaProvider {
    /// Create a new Ollama provider
    pub fn new(host: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            host: host.trim_end_matches('/').to_string(),
            model,
            client,
        })
    }

    fn build_messages(&self, request: &ChatRequest) -> Vec<serde_json::Value> {
        let mut messages = Vec::new();

        if let Some(system) = &request.system_prompt {
            messages.push(serde_json::json!({
                "role": "system",
                "content": system
            }));
        }

        messages.push(serde_json::json!({
            "role": "user",
            "content": request.prompt
        }));

        messages
    }

    fn build_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut options = serde_json::Map::new();
        options.insert(
            "temperature".to_string(),
            serde_json::json!(request.temperature.unwrap_or(0.7)),
        );
        if let Some(max) = request.max_tokens {
            options.insert("num_predict".to_string(), serde_json::json!(max));
        }

        serde_json::json!({
            "model": self.model,
            "messages": self.build_messages(request),
            "stream": false,
            "options": options
        })
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    fn id(&self) -> &str {
        "ollama"
    }

    fn name(&self) -> &str {
        "Ollama"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        let url = format!("{}/api/chat", self.host);
        let body = self.build_body(&request);

        let start = Instant::now();
        let resp = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(LLMError::from_transport)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status, text, None));
        }

        let json: serde_json::Value = resp.json().await.map_err(LLMError::from_transport)?;
        let latency = start.elapsed().as_millis() as u64;

        let content = json["message"]["content"]
            .as_str()
            .ok_or_else(|| LLMError::InvalidResponse("Missing content".to_string()))?
            .to_string();

        Ok(ChatResponse {
            content,
            model: self.model.clone(),
            provider: "ollama".to_string(),
            usage: Some(TokenUsage {
                input_tokens: json["prompt_eval_count"].as_u64().unwrap_or(0) as u32,
                output_tokens: json["eval_count"].as_u64().unwrap_or(0) as u32,
            }),
            finish_reason: json["done_reason"].as_str().map(|s| s.to_string()),
            latency_ms: latency,
        })
    }
}

//! Google Provider Implementation (API Key-based)
//!
//! Gemini models through the Generative Language API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;

use crate::core::llm::error::{LLMError, Result};
use crate::core::llm::provider::LLMProvider;
use crate::core::llm::types::{ChatRequest, ChatResponse, TokenUsage};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Google provider (API key-based)
pub struct GoogleProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GoogleProvider {
    pub fn new(api_key: String, model: String, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        // Trim the API key at construction to keep validation consistent
        Ok(Self {
            api_key: api_key.trim().to_string(),
            model,
            base_url: DEFAULT_BASE_URL.to_string(),
            client,
        })
    }

    /// Point the provider at a different API root.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Check if an API key has valid Google API key format.
    ///
    /// Google API keys typically start with "AIza". This is a pure format check
    /// and does not verify the key with Google's API.
    pub fn is_valid_api_key_format(key: &str) -> bool {
        let trimmed = key.trim();
        !trimmed.is_empty() && trimmed.starts_with("AIza")
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    fn build_body(&self, request: &ChatRequest) -> serde_json::Value {
        let mut body = serde_json::json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": request.prompt }]
            }]
        });

        if let Some(system) = &request.system_prompt {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": system }]
            });
        }

        if request.temperature.is_some() || request.max_tokens.is_some() {
            let mut gen_config = serde_json::Map::new();
            if let Some(temp) = request.temperature {
                gen_config.insert("temperature".to_string(), serde_json::json!(temp));
            }
            if let Some(max) = request.max_tokens {
                gen_config.insert("maxOutputTokens".to_string(), serde_json::json!(max));
            }
            body["generationConfig"] = serde_json::Value::Object(gen_config);
        }

        body
    }

    fn parse_response(&self, json: &serde_json::Value, latency_ms: u64) -> Result<ChatResponse> {
        let candidate = json["candidates"].as_array().and_then(|arr| arr.first());

        let content = candidate
            .and_then(|c| c["content"]["parts"].as_array())
            .map(|parts| {
                parts
                    .iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LLMError::InvalidResponse("Missing content".to_string()))?;

        let usage = json["usageMetadata"].as_object().map(|u| TokenUsage {
            input_tokens: u
                .get("promptTokenCount")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
            output_tokens: u
                .get("candidatesTokenCount")
                .and_then(|v| v.as_u64())
                .unwrap_or(0) as u32,
        });

        Ok(ChatResponse {
            content,
            model: self.model.clone(),
            provider: "google".to_string(),
            usage,
            finish_reason: candidate
                .and_then(|c| c["finishReason"].as_str())
                .map(|s| s.to_string()),
            latency_ms,
        })
    }
}

#[async_trait]
impl LLMProvider for GoogleProvider {
    fn id(&self) -> &str {
        "google"
    }

    fn name(&self) -> &str {
        "Google"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse> {
        if self.api_key.is_empty() {
            return Err(LLMError::NotConfigured("google: missing API key".to_string()));
        }

        let body = self.build_body(&request);

        let start = Instant::now();
        let resp = self
            .client
            .post(self.endpoint())
            .header("content-type", "application/json")
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(LLMError::from_transport)?;

        let status = resp.status();
        let latency = start.elapsed().as_millis() as u64;

        if !status.is_success() {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok());
            let text = resp.text().await.unwrap_or_default();
            return Err(LLMError::from_status(status.as_u16(), text, retry_after));
        }

        let json: serde_json::Value = resp.json().await.map_err(LLMError::from_transport)?;
        self.parse_response(&json, latency)
    }
}

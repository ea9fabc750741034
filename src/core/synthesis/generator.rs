//! Generator Collaborator
//!
//! The language model is an opaque text-in/text-out collaborator. This
//! module defines the seam ([`Generator`]), the bounded call the paths use,
//! the wrapper cleanup applied to raw output, and an adapter from any
//! [`LLMProvider`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::llm::{ChatRequest, LLMError, LLMProvider};

use super::prompts::system_prompt;

/// Default upper bound on a single generator call.
pub const DEFAULT_GENERATOR_TIMEOUT: Duration = Duration::from_secs(20);

/// Which path a generation was requested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationKind {
    SqlFragment,
    FilterSet,
}

/// Sampling and time limits for one generator call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationConstraints {
    pub kind: GenerationKind,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl GenerationConstraints {
    pub fn sql_fragment() -> Self {
        Self {
            kind: GenerationKind::SqlFragment,
            temperature: 0.2,
            max_tokens: 300,
            timeout: DEFAULT_GENERATOR_TIMEOUT,
        }
    }

    pub fn filter_set() -> Self {
        Self {
            kind: GenerationKind::FilterSet,
            temperature: 0.3,
            max_tokens: 150,
            timeout: DEFAULT_GENERATOR_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Unparsed generator output, tagged with the path that requested it.
///
/// Never forwarded past validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawGeneration {
    kind: GenerationKind,
    text: String,
}

impl RawGeneration {
    pub fn kind(&self) -> GenerationKind {
        self.kind
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Why a generator call produced no usable text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeneratorError {
    #[error("Generator timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generator quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("Generator request failed: {0}")]
    Upstream(String),

    #[error("Generator returned a malformed response: {0}")]
    MalformedResponse(String),
}

/// Text-in/text-out model collaborator.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<String, GeneratorError>;
}

/// Call the generator once under the configured timeout and strip
/// presentation wrappers from the result.
///
/// Dropping the returned future abandons the in-flight call.
pub async fn generate_bounded(
    generator: &dyn Generator,
    prompt: &str,
    constraints: &GenerationConstraints,
) -> Result<RawGeneration, GeneratorError> {
    let text = tokio::time::timeout(constraints.timeout, generator.generate(prompt, constraints))
        .await
        .map_err(|_| GeneratorError::Timeout(constraints.timeout))??;

    let cleaned = clean_generation(&text);
    if cleaned.is_empty() {
        return Err(GeneratorError::MalformedResponse(
            "empty generation".to_string(),
        ));
    }

    Ok(RawGeneration {
        kind: constraints.kind,
        text: cleaned,
    })
}

/// Remove Markdown code fences and a single leading `WHERE` keyword.
///
/// Only wrappers are removed; the SQL text itself is never repaired.
pub fn clean_generation(text: &str) -> String {
    let mut content = text.trim();

    if let Some(rest) = content.strip_prefix("```") {
        let info_len = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        let (info, body) = rest.split_at(info_len);
        // An info string is either on its own line or a known language tag
        content = if body.starts_with(&['\n', '\r'][..])
            || ["sql", "json"].iter().any(|tag| info.eq_ignore_ascii_case(tag))
        {
            body
        } else {
            rest
        };
    }
    if let Some(rest) = content.trim_end().strip_suffix("```") {
        content = rest;
    }
    let content = content.trim();

    match content.get(..6) {
        Some(head) if head.eq_ignore_ascii_case("WHERE ") => content[6..].trim().to_string(),
        _ => content.to_string(),
    }
}

// ============================================================================
// LLM adapter
// ============================================================================

/// [`Generator`] backed by an [`LLMProvider`].
pub struct LlmGenerator {
    provider: Arc<dyn LLMProvider>,
}

impl LlmGenerator {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }
}

/// Map a provider failure onto the generator taxonomy.
pub fn map_llm_error(err: LLMError, timeout: Duration) -> GeneratorError {
    match err {
        LLMError::RateLimited { retry_after_secs } => {
            GeneratorError::QuotaExceeded(format!("retry after {retry_after_secs}s"))
        }
        LLMError::ApiError { status: 429, message } => GeneratorError::QuotaExceeded(message),
        LLMError::ApiError { message, .. }
            if message.contains("RESOURCE_EXHAUSTED") || message.to_lowercase().contains("quota") =>
        {
            GeneratorError::QuotaExceeded(message)
        }
        LLMError::Timeout => GeneratorError::Timeout(timeout),
        LLMError::InvalidResponse(msg) => GeneratorError::MalformedResponse(msg),
        LLMError::SerializationError(e) => GeneratorError::MalformedResponse(e.to_string()),
        other => GeneratorError::Upstream(other.to_string()),
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<String, GeneratorError> {
        let request = ChatRequest::new(prompt)
            .with_system(system_prompt(constraints.kind))
            .with_temperature(constraints.temperature)
            .with_max_tokens(constraints.max_tokens);

        let response = self
            .provider
            .chat(request)
            .await
            .map_err(|e| map_llm_error(e, constraints.timeout))?;

        tracing::debug!(
            provider = %response.provider,
            model = %response.model,
            latency_ms = response.latency_ms,
            kind = ?constraints.kind,
            "Generator responded"
        );

        if response.content.trim().is_empty() {
            return Err(GeneratorError::MalformedResponse(
                "empty content".to_string(),
            ));
        }
        Ok(response.content)
    }
}

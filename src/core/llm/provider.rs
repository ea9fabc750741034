//! LLM Provider Trait
//!
//! Defines the trait that all LLM providers must implement.

use async_trait::async_trait;

use super::error::Result;
use super::types::{ChatRequest, ChatResponse};

/// Trait that all LLM providers must implement
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the provider's unique identifier
    fn id(&self) -> &str;

    /// Get the provider's display name
    fn name(&self) -> &str;

    /// Get the model being used
    fn model(&self) -> &str;

    /// Send a chat completion request
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse>;
}

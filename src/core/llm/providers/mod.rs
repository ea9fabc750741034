//! LLM Provider Implementations
//!
//! Concrete providers and the factory that builds one from configuration.

mod google;
mod ollama;

pub use google::GoogleProvider;
pub use ollama::OllamaProvider;

use std::sync::Arc;
use std::time::Duration;

use crate::config::GeneratorConfig;

use super::error::{LLMError, Result};
use super::provider::LLMProvider;

/// Provider ids accepted by [`build_provider`].
pub const PROVIDER_IDS: &[&str] = &["google", "ollama"];

/// Build the configured provider.
pub fn build_provider(config: &GeneratorConfig) -> Result<Arc<dyn LLMProvider>> {
    let timeout = Duration::from_secs(config.timeout_secs);

    match config.provider.trim().to_lowercase().as_str() {
        "google" => {
            let api_key = config
                .api_key
                .as_deref()
                .map(str::trim)
                .filter(|key| !key.is_empty())
                .ok_or_else(|| LLMError::NotConfigured("google: missing API key".to_string()))?;

            if !GoogleProvider::is_valid_api_key_format(api_key) {
                tracing::warn!("Google API key does not look like an AIza key");
            }

            let provider = GoogleProvider::new(api_key.to_string(), config.model.clone(), timeout)?;
            match config.base_url.as_deref().map(str::trim).filter(|url| !url.is_empty()) {
                Some(url) => Ok(Arc::new(provider.with_base_url(url))),
                None => Ok(Arc::new(provider)),
            }
        }
        "ollama" => Ok(Arc::new(OllamaProvider::new(
            config.host.clone(),
            config.model.clone(),
            timeout,
        )?)),
        other => Err(LLMError::NotConfigured(format!(
            "unknown provider '{other}', expected one of: {}",
            PROVIDER_IDS.join(", ")
        ))),
    }
}

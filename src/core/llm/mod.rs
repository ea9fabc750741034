//! LLM Client Module
//!
//! A minimal provider abstraction over hosted and local models. The
//! synthesis pipeline only ever sees the [`LLMProvider`] trait; concrete
//! providers live under `providers`.

pub mod error;
pub mod provider;
pub mod providers;
pub mod types;

pub use error::{LLMError, Result};
pub use provider::LLMProvider;
pub use providers::{build_provider, GoogleProvider, OllamaProvider};
pub use types::{ChatRequest, ChatResponse, TokenUsage};

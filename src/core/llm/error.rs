//! LLM Error Types
//!
//! Defines error types for LLM operations.

/// Errors that can occur during LLM operations
#[derive(Debug, thiserror::Error)]
pub enum LLMError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Rate limited: retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl LLMError {
    /// Collapse transport timeouts into [`LLMError::Timeout`].
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LLMError::Timeout
        } else {
            LLMError::HttpError(err)
        }
    }

    /// Map a non-success HTTP status and body to an error.
    pub fn from_status(status: u16, message: String, retry_after_secs: Option<u64>) -> Self {
        match status {
            429 => LLMError::RateLimited {
                retry_after_secs: retry_after_secs.unwrap_or(0),
            },
            401 | 403 => LLMError::AuthError(message),
            _ => LLMError::ApiError { status, message },
        }
    }
}

/// Result type for LLM operations
pub type Result<T> = std::result::Result<T, LLMError>;

//! AI client error types.

use thiserror::Error;
use goalcoach_core::Error as CoreError;

/// Failures talking to the language model provider.
#[derive(Debug, Error)]
pub enum AiError {
    /// No API key configured.
    #[error("Missing API key for provider {0}")]
    MissingApiKey(String),

    /// Transport failure, including timeouts.
    #[error("Provider request failed: {0}")]
    Request(String),

    /// Non-success HTTP status from the provider.
    #[error("Provider returned HTTP {0}")]
    Status(u16),

    /// The completion had no usable content.
    #[error("Provider returned an empty completion")]
    EmptyCompletion,

    /// The completion could not be decoded into the expected shape.
    #[error("Invalid provider response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    pub fn code(&self) -> &'static str {
        match self {
            AiError::MissingApiKey(_) => "MISSING_API_KEY",
            AiError::Request(_) => "REQUEST_FAILED",
            AiError::Status(_) => "PROVIDER_ERROR",
            AiError::EmptyCompletion => "EMPTY_COMPLETION",
            AiError::InvalidResponse(_) => "INVALID_RESPONSE",
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AiError::Request("request timed out".to_string())
        } else {
            AiError::Request(err.to_string())
        }
    }
}

impl From<AiError> for CoreError {
    fn from(err: AiError) -> Self {
        CoreError::Ai(format!("[{}] {}", err.code(), err))
    }
}

//! Model transport error types

use std::time::Duration;
use thiserror::Error;

/// The four transport failure categories a run distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCategory {
    Auth,
    RateLimited,
    SchemaRejected,
    Other,
}

/// Errors that can occur during a model call
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited or quota exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Response failed schema validation: {0}")]
    SchemaRejected(String),

    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl LlmError {
    /// Map this error onto the transport category it belongs to
    pub fn category(&self) -> TransportCategory {
        match self {
            LlmError::Auth(_) => TransportCategory::Auth,
            LlmError::RateLimited { .. } => TransportCategory::RateLimited,
            LlmError::SchemaRejected(_) => TransportCategory::SchemaRejected,
            LlmError::ApiError { .. }
            | LlmError::Network(_)
            | LlmError::InvalidResponse(_)
            | LlmError::Timeout(_)
            | LlmError::Json(_) => TransportCategory::Other,
        }
    }

    /// Check if this is a rate limit error
    pub fn is_rate_limit(&self) -> bool {
        matches!(self, LlmError::RateLimited { .. })
    }

    /// Human-readable explanation suitable for showing to the operator
    pub fn user_message(&self) -> String {
        match self.category() {
            TransportCategory::Auth => {
                "The model API key is invalid or not authorized. Check the API key configuration.".to_string()
            }
            TransportCategory::RateLimited => {
                "The model API quota was exceeded or the rate limit was hit. Try again later.".to_string()
            }
            TransportCategory::SchemaRejected => format!("The model API rejected the response schema. Details: {}", self),
            TransportCategory::Other => format!("Model API error: {}", self),
        }
    }
}

//! Model client module for DraftLoop
//!
//! Provides the transport seam the iteration loop calls through, plus the
//! Gemini implementation used by the CLI.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod error;
mod gemini;
mod types;

pub use client::ModelClient;
pub use error::{LlmError, TransportCategory};
pub use gemini::GeminiClient;
pub use types::{ContentPart, GenerateRequest, GenerateResponse, UsageMetadata};

use crate::config::LlmConfig;

/// Create a model client based on the provider specified in config
///
/// Supports the "gemini" provider.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn ModelClient>, LlmError> {
    debug!(provider = %config.provider, model = %config.model, "create_client: called");
    match config.provider.as_str() {
        "gemini" => {
            debug!("create_client: creating Gemini client");
            Ok(Arc::new(GeminiClient::from_config(config)?))
        }
        other => {
            debug!(provider = %other, "create_client: unknown provider");
            Err(LlmError::InvalidResponse(format!(
                "Unknown model provider: '{}'. Supported: gemini",
                other
            )))
        }
    }
}

//! ModelClient trait definition

use async_trait::async_trait;

use super::{GenerateRequest, GenerateResponse, LlmError};

/// Stateless model client - each call is independent
///
/// One call per role per round. No conversation state is kept between calls;
/// everything the model needs (background material, brief, carried-forward
/// feedback) travels in the request parts.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send a single structured-output request and wait for the full reply
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError>;
}

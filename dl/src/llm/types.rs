//! Model request/response types for DraftLoop
//!
//! These types describe one structured-output call: ordered content parts in,
//! raw text plus usage metadata out. They are provider-agnostic; the Gemini
//! client translates them to its wire format.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// An opaque segment of model input (background material or instruction text)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContentPart {
    /// Plain text
    Text { text: String },

    /// Binary payload, base64-encoded
    InlineData { mime_type: String, data: String },
}

impl ContentPart {
    /// Create a text part
    pub fn text(text: impl Into<String>) -> Self {
        debug!("ContentPart::text: called");
        ContentPart::Text { text: text.into() }
    }

    /// Create an inline-data part from an already base64-encoded payload
    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        debug!(%mime_type, "ContentPart::inline_data: called");
        ContentPart::InlineData {
            mime_type,
            data: data.into(),
        }
    }

    /// Get text content if this is a text part
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ContentPart::Text { text } => Some(text),
            ContentPart::InlineData { .. } => None,
        }
    }
}

/// A structured-output generation request - everything needed for one model call
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// Model identifier
    pub model: String,

    /// Ordered input parts: background material first, instruction text last
    pub parts: Vec<ContentPart>,

    /// Role-level system instruction
    pub system_instruction: String,

    /// Structural schema the model output must follow
    pub response_schema: serde_json::Value,
}

impl GenerateRequest {
    /// Text of the final part, which is the per-call instruction
    pub fn instruction(&self) -> Option<&str> {
        self.parts.last().and_then(ContentPart::as_text)
    }
}

/// Response from a generation request
#[derive(Debug, Clone, Default)]
pub struct GenerateResponse {
    /// Raw model text (expected to be JSON, but untrusted)
    pub text: String,

    /// Token usage as reported by the transport
    pub usage: UsageMetadata,
}

/// Token usage as reported by the transport; any field may be missing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: Option<u64>,
    pub output_tokens: Option<u64>,
    pub total_tokens: Option<u64>,
}

impl UsageMetadata {
    /// Create usage metadata with all three counters reported
    pub fn new(input_tokens: u64, output_tokens: u64, total_tokens: u64) -> Self {
        Self {
            input_tokens: Some(input_tokens),
            output_tokens: Some(output_tokens),
            total_tokens: Some(total_tokens),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_part_text() {
        let part = ContentPart::text("Hello");
        assert_eq!(part.as_text(), Some("Hello"));
    }

    #[test]
    fn test_content_part_inline_data_has_no_text() {
        let part = ContentPart::inline_data("application/pdf", "JVBERi0=");
        assert!(part.as_text().is_none());
    }

    #[test]
    fn test_request_instruction_is_last_part() {
        let request = GenerateRequest {
            model: "gemini-2.5-flash".to_string(),
            parts: vec![ContentPart::text("background"), ContentPart::text("instruction")],
            system_instruction: String::new(),
            response_schema: serde_json::json!({}),
        };
        assert_eq!(request.instruction(), Some("instruction"));
    }

    #[test]
    fn test_content_part_serde_tagging() {
        let json = serde_json::to_value(ContentPart::text("x")).unwrap();
        assert_eq!(json["kind"], "text");
        assert_eq!(json["text"], "x");
    }
}

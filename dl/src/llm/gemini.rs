//! Google Gemini API client implementation
//!
//! Implements the ModelClient trait for the Generative Language
//! `generateContent` endpoint with structured (JSON) output.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ContentPart, GenerateRequest, GenerateResponse, LlmError, ModelClient, UsageMetadata};
use crate::config::LlmConfig;

/// Gemini API client
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http: Client,
    temperature: Option<f64>,
    timeout: Duration,
}

impl GeminiClient {
    /// Create a client with explicit settings
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        temperature: Option<f64>,
    ) -> Result<Self, LlmError> {
        debug!(?timeout, ?temperature, "GeminiClient::new: called");
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            http,
            temperature,
            timeout,
        })
    }

    /// Create a new client from configuration
    ///
    /// Reads the API key from the environment variable named in config.
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(?config, "from_config: called");
        let api_key = config.get_api_key().map_err(|e| LlmError::Auth(e.to_string()))?;

        Self::new(
            api_key,
            config.base_url.clone(),
            Duration::from_millis(config.timeout_ms),
            config.temperature,
        )
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        )
    }

    /// Build the request body for the Gemini API
    fn build_request_body(&self, request: &GenerateRequest) -> serde_json::Value {
        debug!(model = %request.model, part_count = request.parts.len(), "build_request_body: called");
        let parts: Vec<serde_json::Value> = request.parts.iter().map(convert_part).collect();

        let mut generation_config = serde_json::json!({
            "responseMimeType": "application/json",
            "responseSchema": request.response_schema,
        });
        if let Some(temperature) = self.temperature {
            debug!(temperature, "build_request_body: temperature set");
            generation_config["temperature"] = serde_json::json!(temperature);
        }

        let mut body = serde_json::json!({
            "contents": [{ "role": "user", "parts": parts }],
            "generationConfig": generation_config,
        });

        if !request.system_instruction.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": request.system_instruction }],
            });
        } else {
            debug!("build_request_body: no system instruction");
        }

        body
    }

    /// Parse the Gemini API response
    fn parse_response(&self, api_response: GeminiResponse) -> Result<GenerateResponse, LlmError> {
        debug!(candidate_count = api_response.candidates.len(), "parse_response: called");
        let usage = api_response
            .usage_metadata
            .map(|u| UsageMetadata {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
                total_tokens: u.total_token_count,
            })
            .unwrap_or_default();

        let Some(candidate) = api_response.candidates.into_iter().next() else {
            let reason = api_response
                .prompt_feedback
                .and_then(|f| f.block_reason)
                .unwrap_or_else(|| "no candidates returned".to_string());
            debug!(%reason, "parse_response: no candidate");
            return Err(LlmError::InvalidResponse(format!("No text in model response: {}", reason)));
        };

        let text: String = candidate
            .content
            .map(|c| c.parts)
            .unwrap_or_default()
            .into_iter()
            .filter(|p| !p.thought)
            .filter_map(|p| p.text)
            .collect();

        if text.is_empty() {
            debug!(finish_reason = ?candidate.finish_reason, "parse_response: empty candidate text");
            return Err(LlmError::InvalidResponse(format!(
                "No text in model response (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(GenerateResponse { text, usage })
    }
}

/// Convert a ContentPart to Gemini API format
fn convert_part(part: &ContentPart) -> serde_json::Value {
    match part {
        ContentPart::Text { text } => serde_json::json!({ "text": text }),
        ContentPart::InlineData { mime_type, data } => serde_json::json!({
            "inlineData": { "mimeType": mime_type, "data": data },
        }),
    }
}

/// Classify a non-success HTTP reply into a transport error
fn classify_error(status: u16, body: &str, retry_after: Option<Duration>) -> LlmError {
    debug!(status, body_len = body.len(), "classify_error: called");
    let envelope = serde_json::from_str::<GeminiErrorEnvelope>(body).ok();
    let api_status = envelope.as_ref().map(|e| e.error.status.as_str()).unwrap_or("");
    let message = envelope
        .as_ref()
        .map(|e| e.error.message.clone())
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.to_string());

    if body.contains("API_KEY_INVALID")
        || matches!(status, 401 | 403)
        || matches!(api_status, "UNAUTHENTICATED" | "PERMISSION_DENIED")
    {
        debug!("classify_error: auth");
        return LlmError::Auth(message);
    }

    if status == 429 || api_status == "RESOURCE_EXHAUSTED" {
        debug!("classify_error: rate limited");
        return LlmError::RateLimited { retry_after };
    }

    if message.contains("response failed schema validation") || message.contains("Invalid response") {
        debug!("classify_error: schema rejected");
        return LlmError::SchemaRejected(message);
    }

    debug!("classify_error: generic API error");
    LlmError::ApiError { status, message }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        debug!(model = %request.model, "generate: called");
        let url = self.endpoint(&request.model);
        let body = self.build_request_body(&request);

        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", self.api_key.clone())
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    debug!("generate: request timed out");
                    LlmError::Timeout(self.timeout)
                } else {
                    debug!(error = %e, "generate: network error");
                    LlmError::Network(e)
                }
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs);
            let text = response.text().await.unwrap_or_default();
            warn!(status, "generate: API returned error status");
            return Err(classify_error(status, &text, retry_after));
        }

        debug!("generate: success");
        let api_response: GeminiResponse = response.json().await?;
        self.parse_response(api_response)
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
    prompt_feedback: Option<GeminiPromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    prompt_token_count: Option<u64>,
    candidates_token_count: Option<u64>,
    total_token_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MODEL: &str = "gemini-2.5-flash";

    fn client(base_url: &str) -> GeminiClient {
        GeminiClient::new("AIza-test-key", base_url, Duration::from_secs(5), None).unwrap()
    }

    fn request() -> GenerateRequest {
        GenerateRequest {
            model: MODEL.to_string(),
            parts: vec![
                ContentPart::inline_data("application/pdf", "JVBERi0="),
                ContentPart::text("Write two drafts"),
            ],
            system_instruction: "You are a writer".to_string(),
            response_schema: serde_json::json!({ "type": "OBJECT" }),
        }
    }

    #[test]
    fn test_build_request_body() {
        let client = GeminiClient::new("k", "https://example.com", Duration::from_secs(5), Some(0.4)).unwrap();
        let body = client.build_request_body(&request());

        let parts = &body["contents"][0]["parts"];
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(parts[0]["inlineData"]["mimeType"], "application/pdf");
        assert_eq!(parts[1]["text"], "Write two drafts");
        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a writer");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["responseSchema"]["type"], "OBJECT");
        assert_eq!(body["generationConfig"]["temperature"], 0.4);
    }

    #[test]
    fn test_build_request_body_without_system_instruction() {
        let client = client("https://example.com");
        let mut req = request();
        req.system_instruction = String::new();
        let body = client.build_request_body(&req);
        assert!(body.get("systemInstruction").is_none());
        assert!(body["generationConfig"].get("temperature").is_none());
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = client("https://example.com/");
        assert_eq!(
            client.endpoint(MODEL),
            "https://example.com/v1beta/models/gemini-2.5-flash:generateContent"
        );
    }

    #[test]
    fn test_classify_error_categories() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT","details":[{"reason":"API_KEY_INVALID"}]}}"#;
        assert!(matches!(classify_error(400, body, None), LlmError::Auth(_)));

        assert!(matches!(classify_error(403, "forbidden", None), LlmError::Auth(_)));

        let body = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(classify_error(429, body, None), LlmError::RateLimited { .. }));

        let body = r#"{"error":{"code":400,"message":"response failed schema validation: drafts","status":"INVALID_ARGUMENT"}}"#;
        match classify_error(400, body, None) {
            LlmError::SchemaRejected(msg) => assert!(msg.contains("drafts")),
            other => panic!("Expected SchemaRejected, got {:?}", other),
        }

        match classify_error(500, "boom", None) {
            LlmError::ApiError { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "boom");
            }
            other => panic!("Expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_success() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
            .and(header("x-goog-api-key", "AIza-test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "candidates": [{
                    "content": { "role": "model", "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "{\"drafts\":" },
                        { "text": "[]}" }
                    ]},
                    "finishReason": "STOP"
                }],
                "usageMetadata": {
                    "promptTokenCount": 120,
                    "candidatesTokenCount": 30,
                    "totalTokenCount": 150
                }
            })))
            .mount(&server)
            .await;

        let response = client(&server.uri()).generate(request()).await.unwrap();

        assert_eq!(response.text, "{\"drafts\":[]}");
        assert_eq!(response.usage, UsageMetadata::new(120, 30, 150));
    }

    #[tokio::test]
    async fn test_generate_rate_limited_reads_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "17")
                    .set_body_string("Too many requests"),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri()).generate(request()).await.unwrap_err();
        match err {
            LlmError::RateLimited { retry_after } => assert_eq!(retry_after, Some(Duration::from_secs(17))),
            other => panic!("Expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_invalid_key() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": {
                    "code": 400,
                    "message": "API key not valid. Please pass a valid API key.",
                    "status": "INVALID_ARGUMENT",
                    "details": [{ "reason": "API_KEY_INVALID" }]
                }
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).generate(request()).await.unwrap_err();
        assert!(matches!(err, LlmError::Auth(_)));
    }

    #[tokio::test]
    async fn test_generate_blocked_prompt_is_invalid_response() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "promptFeedback": { "blockReason": "SAFETY" }
            })))
            .mount(&server)
            .await;

        let err = client(&server.uri()).generate(request()).await.unwrap_err();
        match err {
            LlmError::InvalidResponse(msg) => assert!(msg.contains("SAFETY")),
            other => panic!("Expected InvalidResponse, got {:?}", other),
        }
    }
}

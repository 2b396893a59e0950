//! Gemini provider implementation
//!
//! Implements the `ChatProvider` trait against the `generateContent`
//! endpoint. See: https://ai.google.dev/api/generate-content
//!
//! The client deliberately uses the HTTP stack's default timeout (no
//! override) and never retries; a failure is surfaced to the caller as-is.

use crate::error::{ChatError, Result};
use crate::messages::{ChatMessage, Role};
use crate::provider::{ChatProvider, ChatRequest};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

const DEFAULT_GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

/// Configuration for the Gemini provider
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// API key for authentication
    pub api_key: String,

    /// Base URL for the Gemini API
    pub api_base: String,

    /// Model identifier (e.g. "gemini-1.5-flash")
    pub model: String,
}

impl GeminiConfig {
    /// Create a new config with the given API key and default settings
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: DEFAULT_GEMINI_API_BASE.to_string(),
            model: DEFAULT_GEMINI_MODEL.to_string(),
        }
    }

    /// Create config from the `GEMINI_API_KEY` environment variable
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| ChatError::InvalidApiKey)?;
        Ok(Self::new(api_key))
    }

    /// Set a custom API base URL
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Set the model identifier
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

/// Gemini chat provider
pub struct GeminiClient {
    client: Client,
    config: GeminiConfig,
}

impl GeminiClient {
    /// Create a new provider from a configuration
    pub fn with_config(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(ChatError::InvalidApiKey);
        }
        Ok(Self {
            client: Client::new(),
            config,
        })
    }

    /// Create a new provider with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(GeminiConfig::new(api_key))
    }

    /// Create a provider from the `GEMINI_API_KEY` environment variable
    pub fn from_env() -> Result<Self> {
        Self::with_config(GeminiConfig::from_env()?)
    }

    /// Get the current configuration
    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    #[instrument(skip(self, request), fields(model = %self.config.model))]
    async fn generate(&self, request: ChatRequest) -> Result<String> {
        debug!(
            history = request.history.len(),
            "Sending request to Gemini API"
        );

        let gemini_request = build_gemini_request(&request);

        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.api_base, self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .header("Content-Type", "application/json")
            .query(&[("key", &self.config.api_key)])
            .json(&gemini_request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();

            return Err(match status.as_u16() {
                401 | 403 => ChatError::InvalidApiKey,
                429 => ChatError::RateLimited(error_text),
                400 => ChatError::InvalidRequest(error_text),
                _ => ChatError::RequestFailed(format!("HTTP {status}: {error_text}")),
            });
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            ChatError::UnexpectedResponse(format!("failed to parse response: {e}"))
        })?;

        extract_reply(gemini_response)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
struct GeminiRequest {
    #[serde(skip_serializing_if = "Option::is_none", rename = "systemInstruction")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<Part>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "promptFeedback")]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PromptFeedback {
    #[serde(rename = "blockReason")]
    block_reason: Option<String>,
}

// ============================================================================
// Conversion functions
// ============================================================================

/// Build the wire request: history first, then the current message
///
/// Gemini names the assistant role "model"; the system text travels in the
/// separate `systemInstruction` field.
fn build_gemini_request(request: &ChatRequest) -> GeminiRequest {
    let mut contents: Vec<Content> = request.history.iter().map(to_content).collect();
    contents.push(Content {
        role: Some("user".to_string()),
        parts: vec![Part {
            text: request.message.clone(),
        }],
    });

    GeminiRequest {
        system_instruction: request.system.as_ref().map(|text| Content {
            role: None,
            parts: vec![Part { text: text.clone() }],
        }),
        contents,
    }
}

fn to_content(message: &ChatMessage) -> Content {
    let role = match message.role {
        Role::User => "user",
        Role::Assistant => "model",
    };
    Content {
        role: Some(role.to_string()),
        parts: vec![Part {
            text: message.content.clone(),
        }],
    }
}

/// Pull the reply text out of the first candidate
fn extract_reply(response: GeminiResponse) -> Result<String> {
    if let Some(feedback) = &response.prompt_feedback {
        if let Some(reason) = &feedback.block_reason {
            return Err(ChatError::SafetyBlocked(reason.clone()));
        }
    }

    let candidate = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| ChatError::UnexpectedResponse("no candidates in response".to_string()))?;

    if candidate.finish_reason.as_deref() == Some("SAFETY") {
        return Err(ChatError::SafetyBlocked("SAFETY".to_string()));
    }

    let text = candidate
        .content
        .map(|content| {
            content
                .parts
                .into_iter()
                .map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(ChatError::UnexpectedResponse(
            "candidate contained no text".to_string(),
        ));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = GeminiClient::new("test-key").unwrap();
        assert_eq!(client.name(), "gemini");
        assert_eq!(client.config().api_base, DEFAULT_GEMINI_API_BASE);
        assert_eq!(client.config().model, DEFAULT_GEMINI_MODEL);
    }

    #[test]
    fn test_blank_key_rejected() {
        let result = GeminiClient::new("   ");
        assert!(matches!(result, Err(ChatError::InvalidApiKey)));
    }

    #[test]
    fn test_config_builder() {
        let config = GeminiConfig::new("key")
            .with_api_base("http://localhost:9000")
            .with_model("gemini-1.5-pro");
        assert_eq!(config.api_base, "http://localhost:9000");
        assert_eq!(config.model, "gemini-1.5-pro");
    }

    #[test]
    fn test_request_building_roles_and_order() {
        let request = ChatRequest {
            system: Some("You are a market data assistant".to_string()),
            history: vec![
                ChatMessage::user("What was the close?"),
                ChatMessage::assistant("185.75"),
            ],
            message: "And the volume?".to_string(),
        };

        let wire = build_gemini_request(&request);

        assert!(wire.system_instruction.is_some());
        assert_eq!(wire.contents.len(), 3);
        assert_eq!(wire.contents[0].role.as_deref(), Some("user"));
        assert_eq!(wire.contents[1].role.as_deref(), Some("model"));
        assert_eq!(wire.contents[2].role.as_deref(), Some("user"));
        assert_eq!(wire.contents[2].parts[0].text, "And the volume?");
    }

    #[test]
    fn test_request_serialization_field_names() {
        let request = ChatRequest {
            system: Some("framing".to_string()),
            history: vec![],
            message: "hi".to_string(),
        };
        let json = serde_json::to_string(&build_gemini_request(&request)).unwrap();
        assert!(json.contains("\"systemInstruction\""));
        assert!(json.contains("\"contents\""));
        assert!(json.contains("\"parts\""));
    }

    #[test]
    fn test_extract_reply() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"The volume was "},{"text":"1000."}]},"finishReason":"STOP"}]}"#,
        )
        .unwrap();
        assert_eq!(extract_reply(response).unwrap(), "The volume was 1000.");
    }

    #[test]
    fn test_prompt_block_maps_to_safety_error() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#,
        )
        .unwrap();
        assert!(matches!(
            extract_reply(response),
            Err(ChatError::SafetyBlocked(_))
        ));
    }

    #[test]
    fn test_safety_finish_reason_maps_to_safety_error() {
        let response: GeminiResponse = serde_json::from_str(
            r#"{"candidates":[{"finishReason":"SAFETY"}]}"#,
        )
        .unwrap();
        assert!(matches!(
            extract_reply(response),
            Err(ChatError::SafetyBlocked(_))
        ));
    }

    #[test]
    fn test_empty_candidates_is_unexpected() {
        let response: GeminiResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert!(matches!(
            extract_reply(response),
            Err(ChatError::UnexpectedResponse(_))
        ));
    }
}

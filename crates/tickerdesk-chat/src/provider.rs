//! Chat provider trait definition

use crate::Result;
use crate::messages::ChatMessage;
use async_trait::async_trait;

/// One request to a chat completion endpoint
///
/// The current user message travels separately from the prior history; the
/// provider decides how both map onto its wire format.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// System framing text, including any injected data context
    pub system: Option<String>,

    /// Prior conversation turns, oldest first
    pub history: Vec<ChatMessage>,

    /// The new user message
    pub message: String,
}

/// Trait for chat completion providers
///
/// Implementations provide access to different chat services. The session
/// layer only ever talks to this trait.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send one request and return the assistant's reply text
    async fn generate(&self, request: ChatRequest) -> Result<String>;

    /// Provider name (e.g. "gemini")
    fn name(&self) -> &str;
}

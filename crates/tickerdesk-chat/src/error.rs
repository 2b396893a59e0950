//! Error types for chat operations

use thiserror::Error;

/// Result type for chat operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors that can occur during chat operations
///
/// Each variant maps to distinct user-facing copy; none triggers a retry.
#[derive(Debug, Error)]
pub enum ChatError {
    /// Missing or rejected credential
    #[error("Invalid or missing chat API key")]
    InvalidApiKey,

    /// The request itself was malformed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Upstream rate limit hit
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// The response was withheld by content-safety filtering
    #[error("Response blocked by safety filters: {0}")]
    SafetyBlocked(String),

    /// Any other API failure
    #[error("Chat request failed: {0}")]
    RequestFailed(String),

    /// Transport-level failure
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not have the expected shape
    #[error("Unexpected response format: {0}")]
    UnexpectedResponse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Conversation persistence failure
    #[error("Storage error: {0}")]
    Storage(#[from] tickerdesk_utils::KvError),

    /// Spreadsheet store failure while assembling the data context
    #[error("Spreadsheet store error: {0}")]
    Export(#[from] tickerdesk_export::ExportError),
}

//! Chat assistant for tickerdesk
//!
//! Assembles a bounded textual context from selected exported spreadsheets
//! and forwards user questions, plus prior conversation turns, to a
//! generative-AI chat completion endpoint. It includes:
//!
//! - Chat message types and per-conversation JSON persistence
//! - A provider trait with a Gemini implementation
//! - The context builder that inlines selected CSV files
//! - The session orchestrating one send per user turn (no retries)

pub mod context;
pub mod error;
pub mod messages;
pub mod provider;
pub mod providers;
pub mod session;

pub use context::build_data_context;
pub use error::{ChatError, Result};
pub use messages::{ChatMessage, Role};
pub use provider::{ChatProvider, ChatRequest};
pub use providers::gemini::{GeminiClient, GeminiConfig};
pub use session::{ChatSession, Conversation};

//! Conversation persistence and the per-turn send flow

use crate::context::build_data_context;
use crate::error::Result;
use crate::messages::{ChatMessage, Role};
use crate::provider::{ChatProvider, ChatRequest};
use std::sync::Arc;
use tickerdesk_export::SpreadsheetStore;
use tickerdesk_utils::{KvStore, keys};
use tracing::debug;

/// System framing sent with every request, ahead of the data context
const SYSTEM_PROMPT: &str = "You are a financial data assistant. The user has exported stock \
OHLCV spreadsheets; any they selected are included below as CSV. Answer questions about this \
data precisely, and say so when the data does not contain the answer.";

/// Marker substring identifying the seeded welcome message
///
/// Shared between seeding and history filtering so the two cannot drift.
const WELCOME_MARKER: &str = "Ask me anything about your exported spreadsheets";

/// Maximum number of messages forwarded as history per request
const MAX_HISTORY_MESSAGES: usize = 40;

/// One named, persisted conversation
#[derive(Debug)]
pub struct Conversation {
    name: String,
    messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Load a conversation from the key-value store, seeding a welcome
    /// message if it is new
    pub fn load(kv: &KvStore, name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        let mut messages: Vec<ChatMessage> =
            kv.get_json(&keys::conversation(&name))?.unwrap_or_default();

        if messages.is_empty() {
            messages.push(ChatMessage::assistant(format!(
                "Welcome! {WELCOME_MARKER}."
            )));
        }

        Ok(Self { name, messages })
    }

    /// Persist the conversation under its scoped key
    pub fn save(&self, kv: &mut KvStore) -> Result<()> {
        kv.set_json(&keys::conversation(&self.name), &self.messages)?;
        Ok(())
    }

    /// Conversation name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Full transcript, welcome message included
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Append a message to the transcript
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// History as forwarded to the API
    ///
    /// Excludes the seeded welcome message, excludes the most recent user
    /// turn (it travels as the separate current message), and truncates to
    /// the most recent messages.
    pub fn history_for_api(&self) -> Vec<ChatMessage> {
        let mut history: Vec<ChatMessage> = self
            .messages
            .iter()
            .filter(|m| !(m.role == Role::Assistant && m.content.contains(WELCOME_MARKER)))
            .cloned()
            .collect();

        if history.last().is_some_and(|m| m.role == Role::User) {
            history.pop();
        }

        if history.len() > MAX_HISTORY_MESSAGES {
            history.drain(..history.len() - MAX_HISTORY_MESSAGES);
        }

        history
    }
}

/// Orchestrates one chat turn: context assembly, send, transcript update
///
/// No retry policy: a failure is surfaced immediately, and the user message
/// already appended to the transcript is deliberately not rolled back.
pub struct ChatSession {
    provider: Arc<dyn ChatProvider>,
    conversation: Conversation,
}

impl ChatSession {
    /// Create a session over a provider and a loaded conversation
    pub fn new(provider: Arc<dyn ChatProvider>, conversation: Conversation) -> Self {
        Self {
            provider,
            conversation,
        }
    }

    /// The conversation transcript
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Send one user question and return the assistant's reply
    pub async fn send(
        &mut self,
        kv: &mut KvStore,
        store: &SpreadsheetStore,
        question: &str,
    ) -> Result<String> {
        let context = build_data_context(store)?;
        let system = if context.is_empty() {
            SYSTEM_PROMPT.to_string()
        } else {
            format!("{SYSTEM_PROMPT}\n\n{context}")
        };

        self.conversation.push(ChatMessage::user(question));
        self.conversation.save(kv)?;

        let request = ChatRequest {
            system: Some(system),
            history: self.conversation.history_for_api(),
            message: question.to_string(),
        };

        debug!(provider = self.provider.name(), conversation = self.conversation.name(),
               "Sending chat turn");
        let reply = self.provider.generate(request).await?;

        self.conversation.push(ChatMessage::assistant(reply.clone()));
        self.conversation.save(kv)?;

        Ok(reply)
    }
}

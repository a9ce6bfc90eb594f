use std::path::Path;

use anyhow::Context;
use ragpipe_core::ChatMessage;

/// Conversation memory for one interactive session.
///
/// An append-only ordered sequence of turns owned by the session object;
/// nothing global, nothing shared. The optional export writes the whole
/// history in one shot (no append/streaming semantics).
#[derive(Debug, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn record_user(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new("user", content));
    }

    pub fn record_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(ChatMessage::new("assistant", content));
    }

    /// Serializes the history as a JSON array of `{role, content}` records.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let bytes = serde_json::to_vec_pretty(&self.messages)
            .context("serialize conversation history")?;
        std::fs::write(path, bytes)
            .with_context(|| format!("write conversation history to {}", path.display()))
    }
}

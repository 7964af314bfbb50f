//! Conversation settings for a chat

use crate::{Message, Role};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Conversation state handed to a session by its owner.
///
/// Persistence of the conversation lives outside the engine; the session
/// only reads these settings when building a request.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ConversationState {
    /// The provider name, as listed in the catalog
    pub provider: CompactString,

    /// The model to use; empty falls back to the credential or catalog default
    #[serde(default)]
    pub model: CompactString,

    /// System message sent before the conversation
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub system_message: String,

    /// Sampling temperature
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// Max output tokens
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Number of history messages kept in the request window
    #[serde(default = "default_window")]
    pub max_context_messages: usize,

    /// Whether to ask for a streamed answer
    #[serde(default = "default_stream")]
    pub stream: bool,
}

impl ConversationState {
    /// Create a new conversation for the given provider
    pub fn new(provider: impl Into<CompactString>) -> Self {
        Self {
            provider: provider.into(),
            model: CompactString::default(),
            system_message: String::new(),
            temperature: None,
            max_tokens: None,
            max_context_messages: default_window(),
            stream: true,
        }
    }

    /// Set the model
    pub fn with_model(mut self, model: impl Into<CompactString>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the system message
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_message = system.into();
        self
    }

    /// Assemble the request messages for a user turn.
    ///
    /// Keeps the last `max_context_messages` of `history` and appends the
    /// new prompt. The window never starts on a tool result whose call was
    /// cut off.
    pub fn assemble(&self, history: &[Message], prompt: Message) -> Vec<Message> {
        let start = history.len().saturating_sub(self.max_context_messages);
        let mut messages: Vec<Message> = history[start..]
            .iter()
            .skip_while(|m| m.role == Role::Tool)
            .cloned()
            .collect();
        messages.push(prompt);
        messages
    }
}

impl Default for ConversationState {
    fn default() -> Self {
        Self::new("OpenAI")
    }
}

fn default_window() -> usize {
    10
}

fn default_stream() -> bool {
    true
}

//! Request body for Baidu ERNIE chat.

use crate::Turn;
use serde::Serialize;
use serde_json::{Value, json};
use wcore::{Message, Role};

/// The ERNIE chat request body.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// Alternating user and assistant turns, text only.
    pub messages: Vec<Value>,
    /// Always streamed.
    pub stream: bool,
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Max output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    /// Bare function list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub functions: Option<Value>,
}

impl Request {
    /// Build the body for `turn`.
    pub fn new(turn: &Turn<'_>) -> Self {
        let mut system = turn.system().map(str::to_owned);
        let mut messages = Vec::with_capacity(turn.messages.len());
        for message in turn.messages {
            match message.role {
                Role::System => system = Some(message.content.text()),
                Role::User => messages.push(json!({
                    "role": "user",
                    "content": message.content.text(),
                })),
                Role::Assistant | Role::Model => messages.push(assistant(message)),
                Role::Tool => messages.push(json!({
                    "role": "function",
                    "name": message.name,
                    "content": message.content.text(),
                })),
            }
        }

        Self {
            messages,
            stream: true,
            system,
            temperature: turn.temperature(),
            max_output_tokens: turn.max_tokens(),
            functions: turn.tools_manifest(),
        }
    }
}

fn assistant(message: &Message) -> Value {
    let mut value = json!({ "role": "assistant", "content": message.content.text() });
    if let Some(call) = message.tool_calls.first() {
        value["function_call"] = json!({
            "name": call.name,
            "arguments": call.arguments,
        });
    }
    value
}

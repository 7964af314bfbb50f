//! Request body for the Anthropic Messages API.

use crate::{Turn, vision};
use serde::Serialize;
use serde_json::{Value, json};
use wcore::{ContentBlock, Message, Role};

/// Max tokens when neither the conversation nor the catalog sets one.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// The request body for the Anthropic Messages API.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// The model identifier.
    pub model: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// System prompt (top-level, not in messages array).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// The messages array (Anthropic content block format).
    pub messages: Vec<Value>,
    /// Always streamed.
    pub stream: bool,
    /// Tools the model may call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    /// Temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl Request {
    /// Build the body for `turn`, converting messages to content blocks.
    pub fn new(turn: &Turn<'_>) -> Self {
        let mut system = turn.system().map(str::to_owned);
        let mut messages = Vec::with_capacity(turn.messages.len());
        for message in turn.messages {
            match message.role {
                Role::System => system = Some(message.content.text()),
                Role::User => messages.push(json!({
                    "role": "user",
                    "content": user_blocks(turn, message),
                })),
                Role::Assistant | Role::Model => messages.push(json!({
                    "role": "assistant",
                    "content": assistant_blocks(message),
                })),
                Role::Tool => messages.push(json!({
                    "role": "user",
                    "content": [{
                        "type": "tool_result",
                        "tool_use_id": message.tool_call_id,
                        "content": message.content.text(),
                    }],
                })),
            }
        }

        Self {
            model: turn.model_name().to_owned(),
            max_tokens: turn.max_tokens().unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages,
            stream: true,
            tools: turn.tools_manifest(),
            temperature: turn.temperature(),
        }
    }
}

fn user_blocks(turn: &Turn<'_>, message: &Message) -> Vec<Value> {
    vision::expand(&message.content, turn.vision())
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(json!({ "type": "text", "text": text })),
            ContentBlock::ImageUrl { url } => Some(json!({
                "type": "image",
                "source": { "type": "url", "url": url },
            })),
            ContentBlock::ImageData { mime_type, data } => Some(json!({
                "type": "image",
                "source": { "type": "base64", "media_type": mime_type, "data": data },
            })),
            ContentBlock::Function { .. } => None,
        })
        .collect()
}

fn assistant_blocks(message: &Message) -> Vec<Value> {
    let mut content = Vec::new();
    let text = message.content.text();
    if !text.is_empty() {
        content.push(json!({ "type": "text", "text": text }));
    }
    for call in &message.tool_calls {
        let input = call.parse_arguments().unwrap_or_else(|_| json!({}));
        content.push(json!({
            "type": "tool_use",
            "id": call.id,
            "name": call.name,
            "input": input,
        }));
    }
    if content.is_empty() {
        content.push(json!({ "type": "text", "text": "" }));
    }
    content
}

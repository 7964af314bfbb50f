//! Request body for OpenAI-compatible chat completions.

use crate::{Turn, vision};
use serde::Serialize;
use serde_json::{Value, json};
use wcore::{ContentBlock, Message, Role, ToolCall};

/// The chat completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// The model identifier.
    pub model: String,
    /// The messages array.
    pub messages: Vec<Value>,
    /// Whether to stream the response.
    pub stream: bool,
    /// Ask for a final usage chunk.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream_options: Option<Value>,
    /// Sampling temperature.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Max output tokens.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Tools the model may call.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
}

impl Request {
    /// Build the body for `turn`.
    pub fn new(turn: &Turn<'_>) -> Self {
        let stream = turn.stream();
        Self {
            model: turn.model_name().to_owned(),
            messages: messages(turn),
            stream,
            stream_options: (stream && turn.profile.stream_usage)
                .then(|| json!({ "include_usage": true })),
            temperature: turn.temperature(),
            max_tokens: turn.max_tokens(),
            tools: turn.tools_manifest(),
        }
    }
}

/// Render the conversation as a `messages` array.
pub fn messages(turn: &Turn<'_>) -> Vec<Value> {
    let mut out = Vec::with_capacity(turn.messages.len() + 1);
    if let Some(system) = turn.system() {
        out.push(json!({ "role": "system", "content": system }));
    }
    for message in turn.messages {
        out.push(render(turn, message));
    }
    out
}

fn render(turn: &Turn<'_>, message: &Message) -> Value {
    match message.role {
        Role::System => json!({ "role": "system", "content": message.content.text() }),
        Role::Tool => json!({
            "role": "tool",
            "tool_call_id": message.tool_call_id,
            "content": message.content.text(),
        }),
        Role::Assistant | Role::Model => {
            let text = message.content.text();
            let mut value = json!({ "role": "assistant", "content": text });
            if !message.tool_calls.is_empty() {
                if text.is_empty() {
                    value["content"] = Value::Null;
                }
                value["tool_calls"] = message.tool_calls.iter().map(tool_call).collect();
            }
            value
        }
        Role::User => {
            let blocks = vision::expand(&message.content, turn.vision());
            json!({ "role": "user", "content": content(&blocks) })
        }
    }
}

/// Plain text when there are no images, content parts otherwise.
fn content(blocks: &[ContentBlock]) -> Value {
    if !blocks.iter().any(ContentBlock::is_image) {
        let text = blocks
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        return Value::String(text);
    }

    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::Text { text } => Some(json!({ "type": "text", "text": text })),
            ContentBlock::ImageUrl { url } => {
                Some(json!({ "type": "image_url", "image_url": { "url": url } }))
            }
            ContentBlock::ImageData { mime_type, data } => Some(json!({
                "type": "image_url",
                "image_url": { "url": vision::data_url(mime_type, data) },
            })),
            ContentBlock::Function { .. } => None,
        })
        .collect()
}

fn tool_call(call: &ToolCall) -> Value {
    json!({
        "id": call.id,
        "type": "function",
        "function": {
            "name": call.name,
            "arguments": call.arguments,
        },
    })
}

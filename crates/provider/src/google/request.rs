//! Request body for Gemini `generateContent`.

use crate::{Turn, vision};
use serde::Serialize;
use serde_json::{Map, Value, json};
use wcore::{ContentBlock, Message, Role};

/// The `streamGenerateContent` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Conversation turns.
    pub contents: Vec<Value>,
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<Value>,
    /// Sampling parameters.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub generation_config: Map<String, Value>,
    /// Function declarations.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
}

impl Request {
    /// Build the body for `turn`.
    pub fn new(turn: &Turn<'_>) -> Self {
        let mut system = turn.system().map(str::to_owned);
        let mut contents = Vec::with_capacity(turn.messages.len());
        for message in turn.messages {
            match message.role {
                Role::System => system = Some(message.content.text()),
                Role::User => contents.push(json!({
                    "role": "user",
                    "parts": user_parts(turn, message),
                })),
                Role::Assistant | Role::Model => contents.push(json!({
                    "role": "model",
                    "parts": model_parts(message),
                })),
                Role::Tool => contents.push(json!({
                    "role": "user",
                    "parts": [{
                        "functionResponse": {
                            "name": message.name,
                            "response": tool_response(message),
                        },
                    }],
                })),
            }
        }

        let mut generation_config = Map::new();
        if let Some(temperature) = turn.temperature() {
            generation_config.insert("temperature".into(), json!(temperature));
        }
        if let Some(max_tokens) = turn.max_tokens() {
            generation_config.insert("maxOutputTokens".into(), json!(max_tokens));
        }

        Self {
            contents,
            system_instruction: system.map(|text| json!({ "parts": [{ "text": text }] })),
            generation_config,
            tools: turn.tools_manifest(),
        }
    }
}

fn user_parts(turn: &Turn<'_>, message: &Message) -> Vec<Value> {
    let parts: Vec<Value> = vision::expand(&message.content, turn.vision())
        .into_iter()
        .map(|block| match block {
            ContentBlock::Text { text } => json!({ "text": text }),
            ContentBlock::ImageUrl { url } => json!({ "file_data": { "file_uri": url } }),
            ContentBlock::ImageData { mime_type, data } => {
                json!({ "inline_data": { "mime_type": mime_type, "data": data } })
            }
            ContentBlock::Function { name, arguments } => {
                json!({ "functionCall": { "name": name, "args": arguments } })
            }
        })
        .collect();
    if parts.is_empty() {
        return vec![json!({ "text": "" })];
    }
    parts
}

fn model_parts(message: &Message) -> Vec<Value> {
    let mut parts = Vec::new();
    let text = message.content.text();
    if !text.is_empty() {
        parts.push(json!({ "text": text }));
    }
    for call in &message.tool_calls {
        let args = call.parse_arguments().unwrap_or_else(|_| json!({}));
        parts.push(json!({ "functionCall": { "name": call.name, "args": args } }));
    }
    if parts.is_empty() {
        parts.push(json!({ "text": "" }));
    }
    parts
}

/// Tool output as a `functionResponse.response` object.
fn tool_response(message: &Message) -> Value {
    let text = message.content.text();
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(object)) => Value::Object(object),
        _ => json!({ "name": message.name, "content": text }),
    }
}

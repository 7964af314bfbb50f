//! Request body for Ollama `/api/generate`.

use crate::{Turn, vision};
use serde::Serialize;
use serde_json::{Map, Value, json};
use wcore::{ContentBlock, Role};

/// The generate request body.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    /// The model identifier.
    pub model: String,
    /// The latest user prompt.
    pub prompt: String,
    /// System prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    /// Context returned by the previous turn.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
    /// Base64 images attached to the prompt.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<String>,
    /// Always streamed.
    pub stream: bool,
    /// Sampling options.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub options: Map<String, Value>,
}

impl Request {
    /// Build the body for `turn`.
    ///
    /// Earlier turns are carried by the context token rather than
    /// resent, so only the latest user message becomes the prompt.
    pub fn new(turn: &Turn<'_>) -> Self {
        let mut system = turn.system().map(str::to_owned);
        if let Some(message) = turn.messages.iter().rev().find(|m| m.role == Role::System) {
            system = Some(message.content.text());
        }

        let mut prompt = String::new();
        let mut images = Vec::new();
        if let Some(message) = turn.messages.iter().rev().find(|m| m.role == Role::User) {
            let mut texts = Vec::new();
            for block in vision::expand(&message.content, turn.vision()) {
                match block {
                    ContentBlock::Text { text } => texts.push(text),
                    ContentBlock::ImageData { data, .. } => images.push(data),
                    ContentBlock::ImageUrl { .. } | ContentBlock::Function { .. } => {}
                }
            }
            prompt = texts.join("\n");
        }

        let mut options = Map::new();
        if let Some(temperature) = turn.temperature() {
            options.insert("temperature".into(), json!(temperature));
        }
        if let Some(max_tokens) = turn.max_tokens() {
            options.insert("num_predict".into(), json!(max_tokens));
        }

        Self {
            model: turn.model_name().to_owned(),
            prompt,
            system,
            context: turn.continuation.cloned(),
            images,
            stream: true,
            options,
        }
    }
}

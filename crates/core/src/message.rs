//! Provider-neutral request messages

use crate::ToolCall;
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A message in the conversation
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct Message {
    /// The role of the message
    pub role: Role,

    /// The content of the message
    #[serde(default)]
    pub content: Content,

    /// Tool calls issued by the assistant in this message
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// The tool call this message answers (tool role only)
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub tool_call_id: CompactString,

    /// The name of the tool that produced this message (tool role only)
    #[serde(default, skip_serializing_if = "CompactString::is_empty")]
    pub name: CompactString,
}

impl Message {
    /// Create a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: Content::Text(content.into()),
            ..Default::default()
        }
    }

    /// Create a new user message
    pub fn user(content: impl Into<Content>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            ..Default::default()
        }
    }

    /// Create a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Content::Text(content.into()),
            ..Default::default()
        }
    }

    /// Create an assistant message that carries a single tool call
    pub fn tool_call(call: ToolCall) -> Self {
        Self {
            role: Role::Assistant,
            tool_calls: vec![call],
            ..Default::default()
        }
    }

    /// Create a new tool message answering `call`
    pub fn tool(
        content: impl Into<String>,
        call: impl Into<CompactString>,
        name: impl Into<CompactString>,
    ) -> Self {
        Self {
            role: Role::Tool,
            content: Content::Text(content.into()),
            tool_call_id: call.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Whether this message speaks for the model (assistant or model role)
    pub fn is_assistant(&self) -> bool {
        matches!(self.role, Role::Assistant | Role::Model)
    }
}

/// The content of a message: plain text or an ordered list of blocks
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum Content {
    /// Plain text
    Text(String),
    /// Typed content blocks
    Blocks(Vec<ContentBlock>),
}

impl Content {
    /// Concatenated text of the content, ignoring non-text blocks
    pub fn text(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Blocks(blocks) => blocks
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::Text { text } => Some(text.as_str()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }

    /// The content as a list of blocks
    pub fn blocks(&self) -> Vec<ContentBlock> {
        match self {
            Self::Text(text) if text.is_empty() => Vec::new(),
            Self::Text(text) => vec![ContentBlock::Text { text: text.clone() }],
            Self::Blocks(blocks) => blocks.clone(),
        }
    }

    /// Whether the content carries any image block
    pub fn has_images(&self) -> bool {
        match self {
            Self::Text(_) => false,
            Self::Blocks(blocks) => blocks.iter().any(ContentBlock::is_image),
        }
    }

    /// Whether the content is empty
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Blocks(blocks) => blocks.is_empty(),
        }
    }
}

impl Default for Content {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<String> for Content {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Content {
    fn from(text: &str) -> Self {
        Self::Text(text.to_owned())
    }
}

impl From<Vec<ContentBlock>> for Content {
    fn from(blocks: Vec<ContentBlock>) -> Self {
        Self::Blocks(blocks)
    }
}

/// A typed content block
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    /// Plain text
    Text { text: String },
    /// An image referenced by URL
    ImageUrl { url: String },
    /// An image inlined as base64 data
    ImageData { mime_type: String, data: String },
    /// A reference to a function invocation
    Function { name: String, arguments: Value },
}

impl ContentBlock {
    /// Whether this block is an image
    pub fn is_image(&self) -> bool {
        matches!(self, Self::ImageUrl { .. } | Self::ImageData { .. })
    }
}

/// The role of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The user role
    #[default]
    User,
    /// The assistant role
    Assistant,
    /// The system role
    System,
    /// The tool role
    Tool,
    /// The model role (Gemini's name for the assistant)
    Model,
}

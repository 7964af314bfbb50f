//! Typed-event decoder for the Anthropic Messages stream.
//!
//! Each `data:` line carries a frame with an explicit `type`. The frame is
//! deserialized into [`Event`] and converted to canonical events straight
//! away.

use crate::reader::{
    Decode,
    lines::{self, LineDecode, Lines},
};
use compact_str::CompactString;
use serde::Deserialize;
use wcore::{ChatEvent, FinishReason};

/// Decoder state for the typed-event dialect.
#[derive(Debug, Default)]
pub struct TypedEvents {
    lines: Lines,
    input_tokens: u32,
    output_tokens: u32,
}

/// Anthropic SSE event types.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Event {
    MessageStart {
        message: MessageStart,
    },
    ContentBlockStart {
        index: u32,
        content_block: Block,
    },
    ContentBlockDelta {
        index: u32,
        delta: BlockDelta,
    },
    ContentBlockStop,
    MessageDelta {
        #[serde(default)]
        delta: MessageDelta,
        usage: Option<DeltaUsage>,
    },
    MessageStop {
        usage: Option<WireUsage>,
    },
    Ping,
    Error {
        error: WireError,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct MessageStart {
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Block {
    Text {
        #[serde(default)]
        text: String,
    },
    ToolUse {
        id: CompactString,
        name: CompactString,
    },
    Thinking {
        #[serde(default)]
        thinking: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum BlockDelta {
    TextDelta { text: String },
    InputJsonDelta { partial_json: String },
    ThinkingDelta { thinking: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize, Default)]
struct MessageDelta {
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DeltaUsage {
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(rename = "type")]
    kind: Option<CompactString>,
    #[serde(default)]
    message: String,
}

impl TypedEvents {
    fn usage(&self) -> ChatEvent {
        ChatEvent::usage(self.input_tokens, self.output_tokens)
    }

    fn event(&mut self, event: Event, out: &mut Vec<ChatEvent>) {
        match event {
            Event::MessageStart { message } => {
                let usage = message.usage.unwrap_or_default();
                self.input_tokens = usage.input_tokens;
                self.output_tokens = usage.output_tokens;
                out.push(self.usage());
            }
            Event::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                Block::Text { text } if !text.is_empty() => out.push(ChatEvent::content(text)),
                Block::Thinking { thinking } if !thinking.is_empty() => {
                    out.push(ChatEvent::reasoning(thinking))
                }
                Block::ToolUse { id, name } => out.push(ChatEvent::ToolCallStart { index, id, name }),
                _ => {}
            },
            Event::ContentBlockDelta { index, delta } => match delta {
                BlockDelta::TextDelta { text } => out.push(ChatEvent::content(text)),
                BlockDelta::ThinkingDelta { thinking } => out.push(ChatEvent::reasoning(thinking)),
                BlockDelta::InputJsonDelta { partial_json } if !partial_json.is_empty() => {
                    out.push(ChatEvent::ToolCallArgsDelta {
                        index,
                        fragment: partial_json,
                    })
                }
                _ => {}
            },
            Event::MessageDelta { delta, usage } => {
                if let Some(usage) = usage {
                    self.output_tokens += usage.output_tokens;
                    out.push(self.usage());
                }
                if let Some(reason) = delta.stop_reason {
                    out.push(ChatEvent::Finish {
                        reason: FinishReason::from_vendor(&reason),
                    });
                }
            }
            Event::MessageStop { usage } => {
                if let Some(usage) = usage {
                    self.input_tokens = usage.input_tokens;
                    self.output_tokens = usage.output_tokens;
                    out.push(self.usage());
                }
                out.push(ChatEvent::Done);
            }
            Event::Error { error } => out.push(ChatEvent::ProviderError {
                code: error.kind,
                message: error.message,
            }),
            Event::ContentBlockStop | Event::Ping => {}
            Event::Unknown => tracing::debug!("skipping unknown anthropic event"),
        }
    }
}

impl LineDecode for TypedEvents {
    fn buffer(&mut self) -> &mut Lines {
        &mut self.lines
    }

    fn line(&mut self, line: &str, terminated: bool, out: &mut Vec<ChatEvent>) -> bool {
        let trimmed = line.trim();
        let Some(data) = trimmed.strip_prefix("data:") else {
            return terminated || !"data:".starts_with(trimmed);
        };
        let data = data.trim();
        if data.is_empty() {
            return terminated;
        }

        match serde_json::from_str::<Event>(data) {
            Ok(event) => {
                self.event(event, out);
                true
            }
            Err(e) => {
                if terminated {
                    tracing::warn!("failed to parse anthropic event: {e}, data: {data}");
                }
                false
            }
        }
    }
}

impl Decode for TypedEvents {
    fn decode(&mut self, text: &str, out: &mut Vec<ChatEvent>) {
        lines::decode(self, text, out);
    }

    fn finish(&mut self, out: &mut Vec<ChatEvent>) {
        lines::flush(self, out);
    }
}

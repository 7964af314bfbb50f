//! Event-stream decoder for OpenAI-compatible vendors.
//!
//! `data:`-prefixed lines carry chat completion chunks; `data: [DONE]`
//! ends the stream. A body without any `data:` line is a non-streamed
//! completion document, decoded once the body ends.

use crate::reader::{
    Decode,
    lines::{self, LineDecode, Lines},
};
use compact_str::{CompactString, format_compact};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use wcore::{ChatEvent, FinishReason};

const MARKER: &str = "data:";

/// Decoder state for the event-stream dialect.
#[derive(Debug, Default)]
pub struct EventStream {
    lines: Lines,
    started: BTreeSet<u32>,
    streamed: bool,
    body: String,
}

#[derive(Deserialize)]
struct Frame {
    choices: Option<Vec<Choice>>,
    usage: Option<WireUsage>,
    error: Option<WireError>,
}

#[derive(Deserialize)]
struct Choice {
    delta: Option<Delta>,
    message: Option<Delta>,
    finish_reason: Option<String>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Delta {
    content: Option<String>,
    reasoning_content: Option<String>,
    reasoning: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Deserialize)]
struct WireToolCall {
    index: Option<u32>,
    id: Option<CompactString>,
    function: Option<WireFunction>,
}

#[derive(Deserialize, Default)]
struct WireFunction {
    name: Option<CompactString>,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct WireError {
    #[serde(default)]
    message: String,
    code: Option<Value>,
    #[serde(rename = "type")]
    kind: Option<CompactString>,
}

impl WireError {
    fn into_event(self) -> ChatEvent {
        let code = match self.code {
            Some(Value::String(code)) => Some(code.into()),
            Some(Value::Number(code)) => Some(format_compact!("{code}")),
            _ => self.kind,
        };
        ChatEvent::ProviderError {
            code,
            message: self.message,
        }
    }
}

impl EventStream {
    fn frame(&mut self, frame: Frame, out: &mut Vec<ChatEvent>) {
        if let Some(error) = frame.error {
            out.push(error.into_event());
            return;
        }

        let mut usage = frame.usage;
        if let Some(choice) = frame.choices.into_iter().flatten().next() {
            if let Some(delta) = choice.delta.or(choice.message) {
                self.delta(delta, out);
            }
            if let Some(reason) = choice.finish_reason {
                out.push(ChatEvent::Finish {
                    reason: FinishReason::from_vendor(&reason),
                });
            }
            usage = usage.or(choice.usage);
        }

        if let Some(usage) = usage {
            out.push(ChatEvent::usage(usage.prompt_tokens, usage.completion_tokens));
        }
    }

    fn delta(&mut self, delta: Delta, out: &mut Vec<ChatEvent>) {
        if let Some(text) = delta
            .reasoning_content
            .or(delta.reasoning)
            .filter(|t| !t.is_empty())
        {
            out.push(ChatEvent::reasoning(text));
        }
        if let Some(text) = delta.content.filter(|t| !t.is_empty()) {
            out.push(ChatEvent::content(text));
        }

        for (position, call) in delta.tool_calls.into_iter().flatten().enumerate() {
            let index = call.index.unwrap_or(position as u32);
            let function = call.function.unwrap_or_default();
            if self.started.insert(index) {
                out.push(ChatEvent::ToolCallStart {
                    index,
                    id: call.id.unwrap_or_else(|| format_compact!("call_{index}")),
                    name: function.name.unwrap_or_default(),
                });
            }
            if let Some(fragment) = function.arguments.filter(|a| !a.is_empty()) {
                out.push(ChatEvent::ToolCallArgsDelta { index, fragment });
            }
        }
    }
}

impl LineDecode for EventStream {
    fn buffer(&mut self) -> &mut Lines {
        &mut self.lines
    }

    fn line(&mut self, line: &str, terminated: bool, out: &mut Vec<ChatEvent>) -> bool {
        let trimmed = line.trim();
        if let Some(data) = trimmed.strip_prefix(MARKER) {
            self.streamed = true;
            let data = data.trim();
            if data.is_empty() {
                return terminated;
            }
            if data == "[DONE]" {
                out.push(ChatEvent::Done);
                return true;
            }
            return match serde_json::from_str::<Frame>(data) {
                Ok(frame) => {
                    self.frame(frame, out);
                    true
                }
                Err(e) => {
                    if terminated {
                        tracing::warn!("failed to parse chunk: {e}, data: {data}");
                    }
                    false
                }
            };
        }

        if !terminated && !trimmed.is_empty() && MARKER.starts_with(trimmed) {
            return false;
        }
        if trimmed.is_empty()
            || trimmed.starts_with(':')
            || trimmed.starts_with("event:")
            || trimmed.starts_with("id:")
            || trimmed.starts_with("retry:")
        {
            return true;
        }

        self.body.push_str(line);
        if terminated {
            self.body.push('\n');
        }
        true
    }
}

impl Decode for EventStream {
    fn decode(&mut self, text: &str, out: &mut Vec<ChatEvent>) {
        lines::decode(self, text, out);
    }

    fn finish(&mut self, out: &mut Vec<ChatEvent>) {
        lines::flush(self, out);
        if self.streamed || self.body.trim().is_empty() {
            return;
        }

        let body = std::mem::take(&mut self.body);
        match serde_json::from_str::<Frame>(body.trim()) {
            Ok(frame) => self.frame(frame, out),
            Err(e) => tracing::warn!("unrecognized response body: {e}"),
        }
    }
}

//! Marked JSON-line decoder for Baidu ERNIE.
//!
//! Every `data:` line is one complete document carrying content, an end
//! flag and usage. An unmarked line is an error object.

use crate::reader::{
    Decode,
    lines::{self, LineDecode, Lines},
};
use compact_str::{CompactString, format_compact};
use serde::Deserialize;
use serde_json::Value;
use wcore::{ChatEvent, FinishReason};

const MARKER: &str = "data:";

/// Decoder state for the marked JSON-line dialect.
#[derive(Debug, Default)]
pub struct MarkedLines {
    lines: Lines,
    calls: u32,
}

#[derive(Deserialize)]
struct Frame {
    #[serde(default)]
    result: String,
    #[serde(default)]
    is_end: bool,
    finish_reason: Option<String>,
    usage: Option<WireUsage>,
    function_call: Option<FunctionCall>,
    error_code: Option<Value>,
    error_msg: Option<String>,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: CompactString,
    #[serde(default)]
    arguments: String,
}

#[derive(Deserialize)]
struct ErrorLine {
    error_code: Value,
    #[serde(default)]
    error_msg: String,
}

fn provider_error(code: Value, message: String) -> ChatEvent {
    ChatEvent::ProviderError {
        code: Some(match code {
            Value::String(code) => code.into(),
            other => format_compact!("{other}"),
        }),
        message,
    }
}

impl MarkedLines {
    fn frame(&mut self, frame: Frame, out: &mut Vec<ChatEvent>) {
        if let Some(code) = frame.error_code {
            out.push(provider_error(code, frame.error_msg.unwrap_or_default()));
            return;
        }

        if !frame.result.is_empty() {
            out.push(ChatEvent::content(frame.result));
        }
        if let Some(call) = frame.function_call {
            let index = self.calls;
            self.calls += 1;
            out.push(ChatEvent::ToolCallStart {
                index,
                id: format_compact!("call_{index}"),
                name: call.name,
            });
            if !call.arguments.is_empty() {
                out.push(ChatEvent::ToolCallArgsDelta {
                    index,
                    fragment: call.arguments,
                });
            }
        }
        if let Some(usage) = frame.usage {
            out.push(ChatEvent::usage(usage.prompt_tokens, usage.completion_tokens));
        }
        if frame.is_end {
            let reason = match frame.finish_reason.as_deref() {
                Some(reason) if self.calls == 0 => FinishReason::from_vendor(reason),
                _ if self.calls > 0 => FinishReason::ToolCalls,
                _ => FinishReason::Stop,
            };
            out.push(ChatEvent::Finish { reason });
            out.push(ChatEvent::Done);
        }
    }
}

impl LineDecode for MarkedLines {
    fn buffer(&mut self) -> &mut Lines {
        &mut self.lines
    }

    fn line(&mut self, line: &str, terminated: bool, out: &mut Vec<ChatEvent>) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }

        if let Some(data) = trimmed.strip_prefix(MARKER) {
            let data = data.trim();
            if data.is_empty() {
                return terminated;
            }
            return match serde_json::from_str::<Frame>(data) {
                Ok(frame) => {
                    self.frame(frame, out);
                    true
                }
                Err(e) => {
                    if terminated {
                        tracing::warn!("failed to parse baidu frame: {e}, data: {data}");
                    }
                    false
                }
            };
        }
        if !terminated && MARKER.starts_with(trimmed) {
            return false;
        }

        match serde_json::from_str::<ErrorLine>(trimmed) {
            Ok(error) => {
                out.push(provider_error(error.error_code, error.error_msg));
                true
            }
            Err(e) => {
                if terminated {
                    tracing::warn!("unmarked line is not an error object: {e}, data: {trimmed}");
                }
                false
            }
        }
    }
}

impl Decode for MarkedLines {
    fn decode(&mut self, text: &str, out: &mut Vec<ChatEvent>) {
        lines::decode(self, text, out);
    }

    fn finish(&mut self, out: &mut Vec<ChatEvent>) {
        lines::flush(self, out);
    }
}

//! Newline-delimited document decoder for Ollama `/api/generate`.

use crate::reader::{
    Decode,
    lines::{self, LineDecode, Lines},
};
use serde::Deserialize;
use serde_json::Value;
use wcore::{ChatEvent, FinishReason};

/// Decoder state for the NDJSON dialect.
#[derive(Debug, Default)]
pub struct NdJson {
    lines: Lines,
}

#[derive(Deserialize)]
struct Frame {
    #[serde(default)]
    response: String,
    #[serde(default)]
    thinking: String,
    #[serde(default)]
    done: bool,
    done_reason: Option<String>,
    context: Option<Value>,
    prompt_eval_count: Option<u32>,
    eval_count: Option<u32>,
    error: Option<String>,
}

impl NdJson {
    fn frame(&mut self, frame: Frame, out: &mut Vec<ChatEvent>) {
        if let Some(message) = frame.error {
            out.push(ChatEvent::ProviderError {
                code: None,
                message,
            });
            return;
        }

        if !frame.thinking.is_empty() {
            out.push(ChatEvent::reasoning(frame.thinking));
        }
        if !frame.response.is_empty() {
            out.push(ChatEvent::content(frame.response));
        }
        if !frame.done {
            return;
        }

        if frame.prompt_eval_count.is_some() || frame.eval_count.is_some() {
            out.push(ChatEvent::usage(
                frame.prompt_eval_count.unwrap_or_default(),
                frame.eval_count.unwrap_or_default(),
            ));
        }
        if let Some(token) = frame.context {
            out.push(ChatEvent::Continuation { token });
        }
        out.push(ChatEvent::Finish {
            reason: FinishReason::from_vendor(frame.done_reason.as_deref().unwrap_or("stop")),
        });
        out.push(ChatEvent::Done);
    }
}

impl LineDecode for NdJson {
    fn buffer(&mut self) -> &mut Lines {
        &mut self.lines
    }

    fn line(&mut self, line: &str, terminated: bool, out: &mut Vec<ChatEvent>) -> bool {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return true;
        }
        match serde_json::from_str::<Frame>(trimmed) {
            Ok(frame) => {
                self.frame(frame, out);
                true
            }
            Err(e) => {
                if terminated {
                    tracing::warn!("failed to parse ollama line: {e}, data: {trimmed}");
                }
                false
            }
        }
    }
}

impl Decode for NdJson {
    fn decode(&mut self, text: &str, out: &mut Vec<ChatEvent>) {
        lines::decode(self, text, out);
    }

    fn finish(&mut self, out: &mut Vec<ChatEvent>) {
        lines::flush(self, out);
    }
}

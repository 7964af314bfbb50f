//! Per-request accumulation of decoded events.

use compact_str::CompactString;
use serde_json::Value;
use std::collections::BTreeMap;
use wcore::{ChatEvent, FinishReason, ToolCall, Usage};

/// Argument buffer of one streamed tool call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolBuffer {
    /// The call id.
    pub id: CompactString,
    /// The namespaced tool name.
    pub name: CompactString,
    /// Concatenated argument fragments.
    pub arguments: String,
    /// Whether a finish signal closed the buffer.
    pub sealed: bool,
}

/// What one reader has accumulated so far.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamState {
    /// Reply text.
    pub reply: String,
    /// Reasoning text.
    pub reasoning: String,
    /// Tool-call buffers keyed by stream index.
    pub tools: BTreeMap<u32, ToolBuffer>,
    /// Token totals of this request; the last report wins.
    pub usage: Usage,
    /// The reason the model stopped, if it said.
    pub finish: Option<FinishReason>,
    /// Continuation token to replay on the next request.
    pub continuation: Option<Value>,
    /// The terminal error message, if the stream failed.
    pub error: Option<String>,
    /// Whether the stream completed.
    pub done: bool,
    /// Whether the stream was aborted.
    pub aborted: bool,
}

impl StreamState {
    /// Fold one event into the state.
    pub fn apply(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::ContentDelta { text } => self.reply.push_str(text),
            ChatEvent::ReasoningDelta { text } => self.reasoning.push_str(text),
            ChatEvent::ToolCallStart { index, id, name } => {
                if self.tools.contains_key(index) {
                    tracing::warn!("duplicate start for tool call {index}, ignoring");
                    return;
                }
                self.tools.insert(
                    *index,
                    ToolBuffer {
                        id: id.clone(),
                        name: name.clone(),
                        ..Default::default()
                    },
                );
            }
            ChatEvent::ToolCallArgsDelta { index, fragment } => match self.tools.get_mut(index) {
                Some(buffer) if !buffer.sealed => buffer.arguments.push_str(fragment),
                Some(_) => tracing::warn!("arguments for sealed tool call {index}, ignoring"),
                None => tracing::warn!("arguments for unknown tool call {index}, ignoring"),
            },
            ChatEvent::Usage(usage) => self.usage = *usage,
            ChatEvent::Finish { reason } => {
                self.finish = Some(*reason);
                for buffer in self.tools.values_mut() {
                    buffer.sealed = true;
                }
            }
            ChatEvent::Continuation { token } => self.continuation = Some(token.clone()),
            ChatEvent::ProviderError { message, .. } => self.error = Some(message.clone()),
            ChatEvent::Done => self.done = true,
        }
    }

    /// Sealed tool calls in index order.
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.tools
            .iter()
            .filter(|(_, buffer)| buffer.sealed)
            .map(|(index, buffer)| ToolCall {
                id: buffer.id.clone(),
                index: *index,
                name: buffer.name.clone(),
                arguments: buffer.arguments.clone(),
            })
            .collect()
    }

    /// Tool buffers never closed by a finish signal.
    pub fn unsealed(&self) -> impl Iterator<Item = &ToolBuffer> {
        self.tools.values().filter(|buffer| !buffer.sealed)
    }
}

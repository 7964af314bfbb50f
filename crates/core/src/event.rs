//! Canonical stream events
//!
//! Every vendor dialect is decoded into this one union at the parse
//! boundary. Nothing downstream of a reader inspects vendor fields.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One incremental unit of a streamed turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// A piece of reply text
    ContentDelta { text: String },

    /// A piece of reasoning text
    ReasoningDelta { text: String },

    /// A tool call was identified at `index`
    ToolCallStart {
        index: u32,
        id: CompactString,
        name: CompactString,
    },

    /// A fragment of the arguments of the tool call at `index`
    ToolCallArgsDelta { index: u32, fragment: String },

    /// Running token totals for the current request
    Usage(Usage),

    /// The model closed its output; seals every open tool buffer
    Finish { reason: FinishReason },

    /// Opaque server-side context to replay on the next request
    Continuation { token: Value },

    /// An error frame reported by the vendor inside the stream
    ProviderError {
        code: Option<CompactString>,
        message: String,
    },

    /// The stream is complete
    Done,
}

impl ChatEvent {
    /// Shorthand for a content delta
    pub fn content(text: impl Into<String>) -> Self {
        Self::ContentDelta { text: text.into() }
    }

    /// Shorthand for a reasoning delta
    pub fn reasoning(text: impl Into<String>) -> Self {
        Self::ReasoningDelta { text: text.into() }
    }

    /// Shorthand for a usage report
    pub fn usage(input_tokens: u32, output_tokens: u32) -> Self {
        Self::Usage(Usage {
            input_tokens,
            output_tokens,
        })
    }
}

/// Token usage of a request
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Prompt tokens
    pub input_tokens: u32,

    /// Completion tokens
    pub output_tokens: u32,
}

impl Usage {
    /// Sum of input and output tokens
    pub fn total(&self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

impl std::ops::AddAssign for Usage {
    fn add_assign(&mut self, rhs: Self) {
        self.input_tokens = self.input_tokens.saturating_add(rhs.input_tokens);
        self.output_tokens = self.output_tokens.saturating_add(rhs.output_tokens);
    }
}

/// The reason the model stopped generating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// The model finished naturally
    Stop,

    /// The model hit the max token limit
    Length,

    /// The model is making tool calls
    ToolCalls,

    /// Content was filtered
    ContentFilter,

    /// Any other vendor-specific reason
    Other,
}

impl FinishReason {
    /// Map a vendor finish reason string onto the canonical reason
    pub fn from_vendor(reason: &str) -> Self {
        match reason {
            "stop" | "end_turn" | "stop_sequence" | "STOP" | "normal" => Self::Stop,
            "length" | "max_tokens" | "MAX_TOKENS" => Self::Length,
            "tool_calls" | "tool_use" | "function_call" => Self::ToolCalls,
            "content_filter" | "SAFETY" | "RECITATION" => Self::ContentFilter,
            _ => Self::Other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_reasons_map_to_canonical() {
        assert_eq!(FinishReason::from_vendor("tool_use"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::from_vendor("STOP"), FinishReason::Stop);
        assert_eq!(FinishReason::from_vendor("max_tokens"), FinishReason::Length);
        assert_eq!(FinishReason::from_vendor("weird"), FinishReason::Other);
    }

    #[test]
    fn usage_accumulates() {
        let mut total = Usage::default();
        total += Usage {
            input_tokens: 3,
            output_tokens: 4,
        };
        total += Usage {
            input_tokens: 1,
            output_tokens: 2,
        };
        assert_eq!(total.total(), 10);
    }

    #[test]
    fn usage_saturates() {
        let mut total = Usage {
            input_tokens: u32::MAX - 1,
            output_tokens: 5,
        };
        total += Usage {
            input_tokens: 10,
            output_tokens: 1,
        };
        assert_eq!(total.input_tokens, u32::MAX);
        assert_eq!(total.output_tokens, 6);
        assert_eq!(total.total(), u32::MAX);
    }
}

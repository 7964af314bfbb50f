//! Raw-array decoder for Gemini `streamGenerateContent`.
//!
//! The body is one JSON array streamed without per-event framing, so
//! chunks are matched by pattern rather than parsed. Extraction is local to
//! each chunk: a field split across two chunks is lost.

use crate::reader::Decode;
use compact_str::format_compact;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::LazyLock;
use wcore::{ChatEvent, FinishReason};

static TEXT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?m)^\s*"text"\s*:\s*"(.*)"\s*,?\s*$"#).expect("valid text pattern")
});

static FINISH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""finishReason"\s*:\s*"(\w+)""#).expect("valid finish pattern")
});

static PROMPT_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""promptTokenCount"\s*:\s*(\d+)"#).expect("valid prompt token pattern")
});

static OUTPUT_TOKENS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""candidatesTokenCount"\s*:\s*(\d+)"#).expect("valid output token pattern")
});

static ERROR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)"error"\s*:\s*\{.*?"message"\s*:\s*"((?:[^"\\]|\\.)*)""#)
        .expect("valid error pattern")
});

const FUNCTION_CALL: &str = "\"functionCall\"";

/// Decoder state for the raw-array dialect.
#[derive(Debug, Default)]
pub struct RawArray {
    calls: u32,
    input_tokens: u32,
    output_tokens: u32,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    #[serde(default)]
    args: Value,
}

impl Decode for RawArray {
    fn decode(&mut self, text: &str, out: &mut Vec<ChatEvent>) {
        if let Some(captures) = ERROR.captures(text) {
            out.push(ChatEvent::ProviderError {
                code: None,
                message: unescape(&captures[1]),
            });
            return;
        }

        // Text parts and function calls, in the order they appear.
        let mut parts: Vec<(usize, Vec<ChatEvent>)> = TEXT
            .captures_iter(text)
            .filter_map(|captures| {
                let field = captures.get(1)?;
                Some((field.start(), vec![ChatEvent::content(unescape(field.as_str()))]))
            })
            .collect();
        for (start, object) in function_calls(text) {
            match serde_json::from_str::<FunctionCall>(object) {
                Ok(call) => {
                    let index = self.calls;
                    self.calls += 1;
                    let args = match call.args {
                        Value::Null => "{}".to_owned(),
                        args => args.to_string(),
                    };
                    parts.push((
                        start,
                        vec![
                            ChatEvent::ToolCallStart {
                                index,
                                id: format_compact!("call_{index}"),
                                name: call.name.into(),
                            },
                            ChatEvent::ToolCallArgsDelta {
                                index,
                                fragment: args,
                            },
                        ],
                    ));
                }
                Err(e) => tracing::warn!("failed to parse function call: {e}, data: {object}"),
            }
        }
        parts.sort_by_key(|(start, _)| *start);
        out.extend(parts.into_iter().flat_map(|(_, events)| events));

        let input = count(&PROMPT_TOKENS, text);
        let output = count(&OUTPUT_TOKENS, text);
        if input.is_some() || output.is_some() {
            self.input_tokens = input.unwrap_or(self.input_tokens);
            self.output_tokens = output.unwrap_or(self.output_tokens);
            out.push(ChatEvent::usage(self.input_tokens, self.output_tokens));
        }

        if let Some(captures) = FINISH.captures(text) {
            let reason = match &captures[1] {
                "STOP" if self.calls > 0 => FinishReason::ToolCalls,
                other => FinishReason::from_vendor(other),
            };
            out.push(ChatEvent::Finish { reason });
        }
    }
}

fn count(pattern: &Regex, text: &str) -> Option<u32> {
    pattern
        .captures_iter(text)
        .last()
        .and_then(|captures| captures[1].parse().ok())
}

/// Undo the escapes that matter for display: `\n`, `\"` and `\\`.
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Balanced `{...}` objects following each `"functionCall"` key.
fn function_calls(text: &str) -> Vec<(usize, &str)> {
    let mut found = Vec::new();
    let mut from = 0;
    while let Some(offset) = text[from..].find(FUNCTION_CALL) {
        let key = from + offset;
        let after = key + FUNCTION_CALL.len();
        from = after;
        let Some(open) = text[after..].find('{').map(|i| after + i) else {
            break;
        };
        match balanced(&text[open..]) {
            Some(len) => {
                found.push((key, &text[open..open + len]));
                from = open + len;
            }
            None => tracing::warn!("function call split across chunks, dropping"),
        }
    }
    found
}

/// Length of the balanced object at the start of `text`.
fn balanced(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

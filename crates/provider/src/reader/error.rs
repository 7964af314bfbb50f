//! Error-body extraction for non-success responses.

use reqwest::StatusCode;
use serde_json::Value;
use wcore::Error;

/// Turn a non-success response body into an error.
///
/// Prefers a structured `{error:{message}}` body, then the other error
/// shapes vendors use, then the raw text.
pub fn extract_error(status: u16, body: &str) -> Error {
    let trimmed = body.trim();
    let value = serde_json::from_str::<Value>(trimmed).ok();
    let message = value
        .as_ref()
        .and_then(message_of)
        .unwrap_or_else(|| match trimmed {
            "" => StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .unwrap_or("empty response body")
                .to_owned(),
            raw => raw.to_owned(),
        });
    Error::from_status(status, message, value)
}

fn message_of(value: &Value) -> Option<String> {
    if let Some(first) = value.as_array().and_then(|items| items.first()) {
        return message_of(first);
    }

    let text = |v: &Value| v.as_str().map(str::to_owned);
    match value.get("error") {
        Some(Value::Object(error)) => error.get("message").and_then(text),
        Some(Value::String(message)) => Some(message.clone()),
        _ => value
            .get("error_msg")
            .or_else(|| value.get("message"))
            .and_then(text),
    }
}

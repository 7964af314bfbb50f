//! Anthropic Messages API.
//!
//! Differs from the OpenAI chat completions format in message structure,
//! credential header and streaming events.

use crate::{HttpRequest, Turn};
use serde_json::Value;
use wcore::Result;

pub use {request::Request, stream::TypedEvents};

mod request;
mod stream;

/// The Anthropic API version header value.
const API_VERSION: &str = "2023-06-01";

/// Adapter for the Anthropic Messages API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Anthropic;

impl Anthropic {
    /// Build the request body.
    pub fn payload(&self, turn: &Turn<'_>) -> Result<Value> {
        Ok(serde_json::to_value(Request::new(turn))?)
    }

    /// Wrap the body with the `x-api-key` and version headers.
    pub fn request(&self, turn: &Turn<'_>, payload: Value) -> Result<HttpRequest> {
        turn.post(payload)?
            .header("anthropic-version", API_VERSION)
    }
}

//! OpenAI-compatible chat completions.
//!
//! Covers OpenAI, Azure, Mistral, Grok, DeepSeek, Moonshot, Doubao, Zhipu,
//! Perplexity and LM Studio. They differ only in profile data: base URL,
//! path template, credential placement and parameter support.

use crate::{HttpRequest, Turn};
use serde_json::Value;
use wcore::Result;

pub use {request::Request, stream::EventStream};

mod request;
mod stream;

/// Adapter for OpenAI-compatible vendors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenAI;

impl OpenAI {
    /// Build the request body.
    pub fn payload(&self, turn: &Turn<'_>) -> Result<Value> {
        Ok(serde_json::to_value(Request::new(turn))?)
    }

    /// Wrap the body in a request with the vendor's credential placement.
    pub fn request(&self, turn: &Turn<'_>, payload: Value) -> Result<HttpRequest> {
        turn.post(payload)
    }
}

//! Google Gemini.
//!
//! The model goes into the URL path, the key into the `key` query
//! parameter, and the answer streams back as a raw JSON array.

use crate::{HttpRequest, Turn};
use serde_json::Value;
use wcore::Result;

pub use {request::Request, stream::RawArray};

mod request;
mod stream;

/// Adapter for Gemini `streamGenerateContent`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Google;

impl Google {
    /// Build the request body.
    pub fn payload(&self, turn: &Turn<'_>) -> Result<Value> {
        Ok(serde_json::to_value(Request::new(turn))?)
    }

    /// Wrap the body; the key rides on the query string.
    pub fn request(&self, turn: &Turn<'_>, payload: Value) -> Result<HttpRequest> {
        turn.post(payload)
    }
}

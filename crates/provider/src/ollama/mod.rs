//! Ollama `/api/generate`.
//!
//! The envelope is a single prompt plus the opaque `context` returned by
//! the previous answer. The final NDJSON line carries the next context,
//! surfaced as a [`wcore::ChatEvent::Continuation`].

use crate::{HttpRequest, Turn};
use serde_json::Value;
use wcore::Result;

pub use {request::Request, stream::NdJson};

mod request;
mod stream;

/// Adapter for Ollama generate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Ollama;

impl Ollama {
    /// Build the request body.
    pub fn payload(&self, turn: &Turn<'_>) -> Result<Value> {
        Ok(serde_json::to_value(Request::new(turn))?)
    }

    /// Wrap the body; a local server takes no credential.
    pub fn request(&self, turn: &Turn<'_>, payload: Value) -> Result<HttpRequest> {
        turn.post(payload)
    }
}

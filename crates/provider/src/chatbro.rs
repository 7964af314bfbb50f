//! ChatBro stream handles.
//!
//! The chat request returns a handle id instead of a stream; the answer is
//! read from a second `GET` against that handle. Payload and events follow
//! the OpenAI-compatible format.

use crate::{HttpRequest, HttpResponse, Link, Transport, Turn, openai::OpenAI, transport};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde_json::Value;
use wcore::{Error, Result};

/// Adapter for ChatBro.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatBro;

#[derive(Deserialize)]
struct Handle {
    #[serde(alias = "stream_id")]
    id: String,
}

impl ChatBro {
    /// Build the request body.
    pub fn payload(&self, turn: &Turn<'_>) -> Result<Value> {
        OpenAI.payload(turn)
    }

    /// The handle request.
    pub fn request(&self, turn: &Turn<'_>, payload: Value) -> Result<HttpRequest> {
        turn.post(payload)
    }

    /// Create the handle, then open the stream behind it.
    ///
    /// A failed handle request is returned as is, so the reader reports
    /// its status and body.
    pub async fn open<T: Transport>(
        &self,
        request: HttpRequest,
        link: Link<'_, T>,
    ) -> Result<HttpResponse> {
        let authorization = request.headers.get(AUTHORIZATION).cloned();
        let streams = request.url.clone();
        let response = transport::send(link.transport, request, link.cancel).await?;
        if !response.is_success() {
            return Ok(response);
        }

        let text = transport::read_text(response, link.cancel).await?;
        let handle: Handle = serde_json::from_str(&text)
            .map_err(|e| Error::Decode(format!("invalid stream handle: {e}, body: {text}")))?;
        tracing::debug!("opening stream handle {}", handle.id);

        let mut follow = HttpRequest::get(format!("{}/{}", streams.trim_end_matches('/'), handle.id));
        if let Some(authorization) = authorization {
            follow.headers.insert(AUTHORIZATION, authorization);
        }
        transport::send(link.transport, follow, link.cancel).await
    }
}

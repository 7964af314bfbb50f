//! In-memory transport for tests.

use crate::{HttpRequest, HttpResponse, Transport};
use bytes::Bytes;
use futures_util::stream;
use parking_lot::Mutex;
use std::collections::VecDeque;
use wcore::{Error, Result};

/// A canned response.
#[derive(Debug, Clone)]
pub struct Scripted {
    /// Status code.
    pub status: u16,
    /// Body chunks, delivered one per read.
    pub chunks: Vec<Bytes>,
    /// Keep the body open after the last chunk.
    pub stall: bool,
}

impl Scripted {
    /// A 200 response with `chunks`.
    pub fn ok<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Bytes>,
    {
        Self {
            status: 200,
            chunks: chunks.into_iter().map(Into::into).collect(),
            stall: false,
        }
    }

    /// A response with `status` and a single body chunk.
    pub fn status(status: u16, body: &'static str) -> Self {
        Self {
            status,
            chunks: vec![Bytes::from_static(body.as_bytes())],
            stall: false,
        }
    }

    /// Keep the body open after the last chunk.
    pub fn stalled(mut self) -> Self {
        self.stall = true;
        self
    }
}

/// Replays scripted responses in order and records every request.
#[derive(Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Scripted>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedTransport {
    /// A transport answering with `responses` in order.
    pub fn new(responses: impl IntoIterator<Item = Scripted>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request sent so far.
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().clone()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.requests.lock().push(request);
        let Some(scripted) = self.responses.lock().pop_front() else {
            return Err(Error::Transport("no scripted response left".into()));
        };

        let chunks = stream::iter(scripted.chunks.into_iter().map(Ok));
        if scripted.stall {
            return Ok(HttpResponse::new(
                scripted.status,
                futures_util::StreamExt::chain(chunks, stream::pending()),
            ));
        }
        Ok(HttpResponse::new(scripted.status, chunks))
    }
}

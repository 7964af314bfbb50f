//! Stream reader: the protocol state machine.
//!
//! A [`StreamReader`] owns one response body. It waits for a chunk, hands
//! it to the dialect [`Decoder`], emits the decoded events one by one and
//! folds each into its [`StreamState`]. Cancellation is observed between
//! chunk reads; a reader is never resumed once it leaves [`Phase::Awaiting`].

use crate::{
    ByteStream, HttpResponse, anthropic::TypedEvents, baidu::MarkedLines, google::RawArray,
    ollama::NdJson, openai::EventStream,
};
use futures_core::Stream;
use futures_util::StreamExt;
use std::collections::VecDeque;
use tokio_util::sync::CancellationToken;
use wcore::{ChatEvent, Dialect, Error, Result};

pub use {
    error::extract_error,
    state::{StreamState, ToolBuffer},
};

mod error;
pub(crate) mod lines;
mod state;

/// Decodes text of one dialect into events.
pub(crate) trait Decode {
    /// Decode the next piece of body text.
    fn decode(&mut self, text: &str, out: &mut Vec<ChatEvent>);

    /// The body ended; flush anything still buffered.
    fn finish(&mut self, _out: &mut Vec<ChatEvent>) {}
}

/// Where a reader is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Waiting for the next chunk.
    Awaiting,
    /// The stream completed.
    Done,
    /// The stream was cancelled.
    Aborted,
    /// The stream failed.
    Failed,
}

/// Byte-level decoder for one dialect.
///
/// Multi-byte characters split across chunks are carried over until
/// complete, so dialect decoders only ever see whole characters.
pub struct Decoder {
    carry: Vec<u8>,
    dialect: Dialects,
}

enum Dialects {
    EventStream(EventStream),
    TypedEvent(TypedEvents),
    RawArray(RawArray),
    MarkedJson(MarkedLines),
    NdJson(NdJson),
}

impl Dialects {
    fn inner(&mut self) -> &mut dyn Decode {
        match self {
            Self::EventStream(d) => d,
            Self::TypedEvent(d) => d,
            Self::RawArray(d) => d,
            Self::MarkedJson(d) => d,
            Self::NdJson(d) => d,
        }
    }
}

impl Decoder {
    /// A decoder for `dialect`.
    pub fn new(dialect: Dialect) -> Self {
        let dialect = match dialect {
            Dialect::EventStream => Dialects::EventStream(EventStream::default()),
            Dialect::TypedEvent => Dialects::TypedEvent(TypedEvents::default()),
            Dialect::RawArray => Dialects::RawArray(RawArray::default()),
            Dialect::MarkedJson => Dialects::MarkedJson(MarkedLines::default()),
            Dialect::NdJson => Dialects::NdJson(NdJson::default()),
        };
        Self {
            carry: Vec::new(),
            dialect,
        }
    }

    /// Decode one chunk of body bytes.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<ChatEvent> {
        self.carry.extend_from_slice(bytes);
        let complete = match std::str::from_utf8(&self.carry) {
            Ok(_) => self.carry.len(),
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            Err(_) => self.carry.len(),
        };
        let rest = self.carry.split_off(complete);
        let text = String::from_utf8_lossy(&self.carry).into_owned();
        self.carry = rest;

        let mut out = Vec::new();
        if !text.is_empty() {
            self.dialect.inner().decode(&text, &mut out);
        }
        out
    }

    /// The body ended; flush buffered bytes and fragments.
    pub fn finish(&mut self) -> Vec<ChatEvent> {
        let mut out = Vec::new();
        if !self.carry.is_empty() {
            let text = String::from_utf8_lossy(&self.carry).into_owned();
            self.carry.clear();
            self.dialect.inner().decode(&text, &mut out);
        }
        self.dialect.inner().finish(&mut out);
        out
    }
}

/// Decodes one response into canonical events.
pub struct StreamReader {
    status: u16,
    body: ByteStream,
    decoder: Decoder,
    cancel: CancellationToken,
    pending: VecDeque<ChatEvent>,
    state: StreamState,
    phase: Phase,
}

impl StreamReader {
    /// Wrap `response`, decoding with `decoder`.
    pub fn new(decoder: Decoder, response: HttpResponse, cancel: CancellationToken) -> Self {
        Self {
            status: response.status,
            body: response.body,
            decoder,
            cancel,
            pending: VecDeque::new(),
            state: StreamState::default(),
            phase: Phase::Awaiting,
        }
    }

    /// What has been accumulated so far.
    pub fn state(&self) -> &StreamState {
        &self.state
    }

    /// Consume the reader, keeping its accumulated state.
    pub fn into_state(self) -> StreamState {
        self.state
    }

    /// The current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The next event.
    ///
    /// Returns `None` once the reader reached a terminal phase. A failure
    /// or cancellation is returned once as an error.
    pub async fn next(&mut self) -> Option<Result<ChatEvent>> {
        loop {
            if self.phase == Phase::Awaiting && self.cancel.is_cancelled() {
                return Some(Err(self.abort()));
            }

            if let Some(event) = self.pending.pop_front() {
                self.state.apply(&event);
                match event {
                    ChatEvent::Done => self.terminate(Phase::Done),
                    ChatEvent::ProviderError { .. } => self.terminate(Phase::Failed),
                    _ => {}
                }
                return Some(Ok(event));
            }

            if self.phase != Phase::Awaiting {
                return None;
            }

            if !(200..300).contains(&self.status) {
                return Some(Err(self.fail_status().await));
            }

            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                next = self.body.next() => Some(next),
            };
            match next {
                None => return Some(Err(self.abort())),
                Some(Some(Ok(bytes))) => {
                    tracing::trace!("chunk: {}", String::from_utf8_lossy(&bytes));
                    self.pending.extend(self.decoder.feed(&bytes));
                }
                Some(Some(Err(e))) => {
                    tracing::error!("stream failed: {e}");
                    self.state.error = Some(e.to_string());
                    self.terminate(Phase::Failed);
                    return Some(Err(e));
                }
                Some(None) => {
                    self.pending.extend(self.decoder.finish());
                    self.pending.push_back(ChatEvent::Done);
                }
            }
        }
    }

    /// Convert the reader into a stream of events.
    pub fn into_stream(mut self) -> impl Stream<Item = Result<ChatEvent>> + Send {
        async_stream::stream! {
            while let Some(event) = self.next().await {
                yield event;
            }
        }
    }

    fn terminate(&mut self, phase: Phase) {
        self.phase = phase;
        self.pending.clear();
    }

    fn abort(&mut self) -> Error {
        tracing::debug!("stream aborted");
        self.state.aborted = true;
        self.terminate(Phase::Aborted);
        Error::Aborted
    }

    async fn fail_status(&mut self) -> Error {
        let mut body = Vec::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => None,
                next = self.body.next() => Some(next),
            };
            match next {
                None => return self.abort(),
                Some(Some(Ok(bytes))) => body.extend_from_slice(&bytes),
                Some(Some(Err(e))) => {
                    self.terminate(Phase::Failed);
                    return e;
                }
                Some(None) => break,
            }
        }

        let error = extract_error(self.status, &String::from_utf8_lossy(&body));
        tracing::error!("request failed: {error}");
        self.state.error = Some(error.to_string());
        self.terminate(Phase::Failed);
        error
    }
}

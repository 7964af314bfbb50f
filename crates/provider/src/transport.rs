//! HTTP transport seam.
//!
//! The engine never talks to reqwest directly: builders emit an
//! [`HttpRequest`], a [`Transport`] returns a status and a byte stream.
//! [`HttpTransport`] is the reqwest-backed implementation; tests substitute
//! their own.

use crate::HttpRequest;
use bytes::Bytes;
use futures_core::Stream;
use futures_util::StreamExt;
use reqwest::Client;
use std::{future::Future, pin::Pin};
use tokio_util::sync::CancellationToken;
use wcore::{Error, Result};

/// A boxed stream of body chunks.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Response head plus the unread body.
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// The body, chunk by chunk.
    pub body: ByteStream,
}

impl HttpResponse {
    /// Build a response from a status and a chunk stream.
    pub fn new(status: u16, body: impl Stream<Item = Result<Bytes>> + Send + 'static) -> Self {
        Self {
            status,
            body: Box::pin(body),
        }
    }

    /// Whether the status is 2xx.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Read the whole body as text.
    pub async fn text(mut self) -> Result<String> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.body.next().await {
            buf.extend_from_slice(&chunk?);
        }
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl std::fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Sends prepared requests.
pub trait Transport: Send + Sync {
    /// Send `request` and return once the response head has arrived.
    fn send(&self, request: HttpRequest) -> impl Future<Output = Result<HttpResponse>> + Send;
}

/// The reqwest-backed transport.
#[derive(Clone, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Wrap an existing client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        if let Some(body) = &request.body {
            tracing::trace!("request: {} {}", request.url, body);
        }
        let mut builder = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers);
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let body = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(transport_error));
        Ok(HttpResponse::new(status, body))
    }
}

/// Send `request`, giving up with [`Error::Aborted`] once `cancel` fires.
pub async fn send<T: Transport>(
    transport: &T,
    request: HttpRequest,
    cancel: &CancellationToken,
) -> Result<HttpResponse> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Aborted),
        response = transport.send(request) => response,
    }
}

/// Read a whole response body, giving up once `cancel` fires.
pub async fn read_text(response: HttpResponse, cancel: &CancellationToken) -> Result<String> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Aborted),
        text = response.text() => text,
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    Error::Transport(e.to_string())
}

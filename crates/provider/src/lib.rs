//! Vendor catalog, request builders and stream readers for Crabwire.
//!
//! Every vendor is reached through one [`Adapter`] variant. An adapter
//! turns a [`Turn`] into an [`HttpRequest`], opens it over a [`Transport`]
//! and wraps the response in a [`StreamReader`] that decodes the vendor's
//! wire dialect into canonical [`wcore::ChatEvent`]s.

pub use {
    adapter::{Adapter, Link, Turn},
    reader::{Decoder, Phase, StreamReader, StreamState, ToolBuffer, extract_error},
    request::HttpRequest,
    token::{AccessToken, TokenCache},
    transport::{ByteStream, HttpResponse, HttpTransport, Transport, send},
};

pub mod anthropic;
pub mod baidu;
pub mod catalog;
pub mod chatbro;
pub mod google;
pub mod ollama;
pub mod openai;
#[cfg(feature = "testing")]
pub mod testing;
pub mod vision;

mod adapter;
mod reader;
mod request;
mod token;
mod transport;

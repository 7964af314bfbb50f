//! Core types for the Crabwire streaming chat engine.
//!
//! This crate holds the provider-neutral vocabulary shared by every layer:
//! request [`Message`]s, the neutral [`Tool`] descriptor, the canonical
//! [`ChatEvent`] union, static [`ProviderProfile`]s, caller-supplied
//! [`Credentials`] and [`ConversationState`], and the [`Error`] taxonomy.

pub use {
    conversation::ConversationState,
    credentials::{Credentials, Field},
    error::{Error, Result},
    event::{ChatEvent, FinishReason, Usage},
    message::{ContentBlock, Content, Message, Role},
    profile::{
        Auth, Bounds, Dialect, ModelProfile, ProviderProfile, ToolStyle, Vendor, Vision,
    },
    tool::{InputSchema, NAMESPACE_SEPARATOR, Tool, ToolCall},
};

mod conversation;
mod credentials;
mod error;
mod event;
mod message;
mod profile;
mod tool;

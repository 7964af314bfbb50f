//! Crabwire chat sessions.
//!
//! [`ChatSession`] is the public facade: it assembles each request through
//! the provider adapters, relays decoded events to [`Callbacks`], and runs
//! model-issued tool calls through a [`ToolRegistry`] until the model
//! answers without one.

pub use {
    callbacks::{Callbacks, ChatResult},
    orchestrator::{MAX_TOOL_DEPTH, Orchestrator},
    registry::{Handler, StaticRegistry, ToolInvocation, ToolOutput, ToolRegistry},
    session::ChatSession,
};

mod callbacks;
mod orchestrator;
mod registry;
mod session;

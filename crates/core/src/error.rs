//! Error taxonomy of the chat engine

use compact_str::CompactString;
use serde_json::Value;

/// Result alias used across the engine
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the chat engine
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Network, TLS or timeout failure below HTTP
    #[error("transport error: {0}")]
    Transport(String),

    /// The vendor answered with a non-success status
    #[error("http {status}: {message}")]
    HttpStatus {
        status: u16,
        message: String,
        body: Option<Value>,
    },

    /// A frame could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// The vendor reported an error inside the stream
    #[error("provider error: {message}")]
    Provider {
        code: Option<CompactString>,
        message: String,
    },

    /// The tool registry failed to execute a call
    #[error("tool {name} failed: {message}")]
    ToolExecution { name: CompactString, message: String },

    /// Missing or rejected credentials
    #[error("auth error: {message}")]
    Auth { status: Option<u16>, message: String },

    /// The turn was cancelled by the caller
    #[error("aborted")]
    Aborted,

    /// A turn is already in flight on this session
    #[error("a turn is already in flight on this session")]
    Busy,

    /// The tool-call chain exceeded its request bound
    #[error("tool call chain exceeded {0} requests")]
    ToolDepth(usize),

    /// Unknown provider, model or malformed settings
    #[error("config error: {0}")]
    Config(String),

    /// JSON (de)serialization failure
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is a cooperative cancellation
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// The HTTP status attached to this error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::HttpStatus { status, .. } => Some(*status),
            Self::Auth { status, .. } => *status,
            _ => None,
        }
    }

    /// Build the error for a non-success status.
    ///
    /// 401 and 403 are credential rejections; everything else keeps the
    /// structured body when there is one.
    pub fn from_status(status: u16, message: String, body: Option<Value>) -> Self {
        match status {
            401 | 403 => Self::Auth {
                status: Some(status),
                message,
            },
            _ => Self::HttpStatus {
                status,
                message,
                body,
            },
        }
    }
}

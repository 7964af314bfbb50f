//! Session callbacks and the turn result.

use serde_json::Value;
use wcore::{Error, Usage};

/// The outcome of one top-level chat turn.
#[derive(Debug, Default)]
pub struct ChatResult {
    /// Reply text accumulated across the tool chain.
    pub reply: String,
    /// Reasoning text accumulated across the tool chain.
    pub reasoning: String,
    /// Token totals summed over every request of the chain.
    pub usage: Usage,
    /// Requests issued for this turn.
    pub requests: usize,
    /// Continuation token of the last request, if the vendor sent one.
    pub continuation: Option<Value>,
    /// The failure that ended the turn, if any.
    pub error: Option<Error>,
    /// The turn was cut short by `abort()`.
    pub aborted: bool,
}

impl ChatResult {
    /// Whether the turn completed without error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

type OnReading = Box<dyn Fn(&str, &str) + Send + Sync>;
type OnToolCalls = Box<dyn Fn(&str) + Send + Sync>;
type OnComplete = Box<dyn Fn(&ChatResult) + Send + Sync>;
type OnError = Box<dyn Fn(&Error, bool) + Send + Sync>;

/// Callbacks a session fires during a turn.
///
/// Every callback is optional; unset ones are skipped.
#[derive(Default)]
pub struct Callbacks {
    on_reading: Option<OnReading>,
    on_tool_calls: Option<OnToolCalls>,
    on_complete: Option<OnComplete>,
    on_error: Option<OnError>,
}

impl Callbacks {
    /// Called with `(content, reasoning)` for every text delta; one of
    /// the two is empty.
    pub fn on_reading(mut self, f: impl Fn(&str, &str) + Send + Sync + 'static) -> Self {
        self.on_reading = Some(Box::new(f));
        self
    }

    /// Called with the namespaced tool name right before it runs.
    pub fn on_tool_calls(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_tool_calls = Some(Box::new(f));
        self
    }

    /// Called once per turn with the final result.
    pub fn on_complete(mut self, f: impl Fn(&ChatResult) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(f));
        self
    }

    /// Called with the error and whether the turn was aborted.
    pub fn on_error(mut self, f: impl Fn(&Error, bool) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    pub(crate) fn reading(&self, content: &str, reasoning: &str) {
        if let Some(f) = &self.on_reading {
            f(content, reasoning);
        }
    }

    pub(crate) fn tool_calls(&self, name: &str) {
        if let Some(f) = &self.on_tool_calls {
            f(name);
        }
    }

    pub(crate) fn complete(&self, result: &ChatResult) {
        if let Some(f) = &self.on_complete {
            f(result);
        }
    }

    pub(crate) fn error(&self, error: &Error, aborted: bool) {
        if let Some(f) = &self.on_error {
            f(error, aborted);
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("on_reading", &self.on_reading.is_some())
            .field("on_tool_calls", &self.on_tool_calls.is_some())
            .field("on_complete", &self.on_complete.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

//! The chat session facade.

use crate::{Callbacks, ChatResult, MAX_TOOL_DEPTH, Orchestrator, ToolRegistry};
use parking_lot::Mutex;
use provider::{Link, TokenCache, Transport, catalog};
use serde_json::Value;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio_util::sync::CancellationToken;
use wcore::{ConversationState, Credentials, Error, Message, ProviderProfile, Result};

/// A conversation with one provider.
///
/// Owns the abort signal and the callbacks. At most one turn runs at a
/// time; `abort` may be called from any task while it does.
pub struct ChatSession<T, R> {
    profile: &'static ProviderProfile,
    credentials: Credentials,
    conversation: ConversationState,
    transport: Arc<T>,
    registry: Arc<R>,
    tokens: Arc<TokenCache>,
    callbacks: Callbacks,
    max_depth: usize,
    busy: AtomicBool,
    cancel: Mutex<CancellationToken>,
    continuation: Mutex<Option<Value>>,
}

impl<T: Transport, R: ToolRegistry> ChatSession<T, R> {
    /// A session for `profile`.
    pub fn new(
        profile: &'static ProviderProfile,
        credentials: Credentials,
        conversation: ConversationState,
        transport: Arc<T>,
        registry: Arc<R>,
    ) -> Self {
        Self {
            profile,
            credentials,
            conversation,
            transport,
            registry,
            tokens: Arc::new(TokenCache::new()),
            callbacks: Callbacks::default(),
            max_depth: MAX_TOOL_DEPTH,
            busy: AtomicBool::new(false),
            cancel: Mutex::new(CancellationToken::new()),
            continuation: Mutex::new(None),
        }
    }

    /// A session for the provider the conversation names.
    pub fn from_catalog(
        credentials: Credentials,
        conversation: ConversationState,
        transport: Arc<T>,
        registry: Arc<R>,
    ) -> Result<Self> {
        let profile = catalog::find(&conversation.provider).ok_or_else(|| {
            Error::Config(format!("unknown provider {}", conversation.provider))
        })?;
        Ok(Self::new(
            profile,
            credentials,
            conversation,
            transport,
            registry,
        ))
    }

    /// Share a token cache with other sessions.
    pub fn with_tokens(mut self, tokens: Arc<TokenCache>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Set the callbacks.
    pub fn with_callbacks(mut self, callbacks: Callbacks) -> Self {
        self.callbacks = callbacks;
        self
    }

    /// Bound the tool chain to `depth` request cycles.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// The provider profile.
    pub fn profile(&self) -> &'static ProviderProfile {
        self.profile
    }

    /// The conversation settings.
    pub fn conversation(&self) -> &ConversationState {
        &self.conversation
    }

    /// Whether every credential field the provider requires is set.
    pub fn is_ready(&self) -> bool {
        self.profile.is_ready(&self.credentials)
    }

    /// Whether a turn is in flight.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// The continuation token the next turn will replay.
    pub fn continuation(&self) -> Option<Value> {
        self.continuation.lock().clone()
    }

    /// Forget the continuation token.
    pub fn reset(&self) {
        *self.continuation.lock() = None;
    }

    /// Cancel the turn in flight, if any.
    pub fn abort(&self) {
        self.cancel.lock().cancel();
    }

    /// Run one turn over `messages`.
    ///
    /// Fails only with [`Error::Busy`] when another turn is in flight.
    /// Every other failure is reported through `on_error` and carried in
    /// the returned result; `on_complete` fires exactly once either way.
    pub async fn chat(&self, messages: Vec<Message>) -> Result<ChatResult> {
        // Busy flag and turn token change under the lock `abort` takes.
        let (_busy, cancel) = {
            let mut slot = self.cancel.lock();
            if self
                .busy
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                return Err(Error::Busy);
            }
            let cancel = CancellationToken::new();
            *slot = cancel.clone();
            (Busy(&self.busy), cancel)
        };

        let tools = match self.registry.list_tools().await {
            Ok(tools) => tools,
            Err(e) => {
                tracing::warn!("failed to list tools, continuing without: {e}");
                Vec::new()
            }
        };

        let mut result = ChatResult {
            continuation: self.continuation(),
            ..Default::default()
        };
        let orchestrator = Orchestrator {
            profile: self.profile,
            credentials: &self.credentials,
            conversation: &self.conversation,
            tools: &tools,
            link: Link {
                transport: &*self.transport,
                tokens: &self.tokens,
                cancel: &cancel,
            },
            registry: &*self.registry,
            callbacks: &self.callbacks,
            max_depth: self.max_depth,
        };

        match orchestrator.run(messages, &mut result).await {
            Ok(()) => {
                if let Some(token) = &result.continuation {
                    *self.continuation.lock() = Some(token.clone());
                }
            }
            Err(e) => {
                let aborted = e.is_aborted();
                if aborted {
                    tracing::debug!("turn aborted after {} request(s)", result.requests);
                } else {
                    tracing::error!("turn failed: {e}");
                }
                self.callbacks.error(&e, aborted);
                result.aborted = aborted;
                result.error = Some(e);
            }
        }

        self.callbacks.complete(&result);
        Ok(result)
    }
}

/// Clears the busy flag when the turn ends, dropped futures included.
struct Busy<'a>(&'a AtomicBool);

impl Drop for Busy<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

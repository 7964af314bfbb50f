//! Tool-call chain.
//!
//! One request/decode cycle per step. Sealed tool calls are executed
//! through the registry one at a time, their results appended to the
//! message list, and the next cycle starts with the extended list.

use crate::{Callbacks, ChatResult, ToolInvocation, ToolRegistry};
use provider::{Adapter, Link, StreamReader, Transport, Turn};
use wcore::{
    ChatEvent, ConversationState, Credentials, Error, Message, ProviderProfile, Result, Tool,
    ToolCall,
};

/// Request cycles allowed per top-level turn.
pub const MAX_TOOL_DEPTH: usize = 16;

/// Drives one top-level turn through its tool chain.
pub struct Orchestrator<'a, T, R> {
    /// The vendor profile.
    pub profile: &'a ProviderProfile,
    /// Credentials for the vendor.
    pub credentials: &'a Credentials,
    /// Conversation settings.
    pub conversation: &'a ConversationState,
    /// Tools offered to the model.
    pub tools: &'a [Tool],
    /// Transport, token cache and abort signal.
    pub link: Link<'a, T>,
    /// Where tool calls are executed.
    pub registry: &'a R,
    /// Callbacks fired along the way.
    pub callbacks: &'a Callbacks,
    /// Request cycles allowed.
    pub max_depth: usize,
}

impl<T: Transport, R: ToolRegistry> Orchestrator<'_, T, R> {
    /// Run the chain until a cycle ends without tool calls.
    ///
    /// `result` accumulates across cycles and keeps whatever was gathered
    /// when an error ends the chain.
    pub async fn run(&self, mut messages: Vec<Message>, result: &mut ChatResult) -> Result<()> {
        let adapter = Adapter::new(self.profile);
        for cycle in 1..=self.max_depth {
            let calls = self.cycle(adapter, &messages, result).await?;
            if calls.is_empty() {
                return Ok(());
            }
            if cycle == self.max_depth {
                break;
            }

            tracing::debug!("cycle {cycle} issued {} tool call(s)", calls.len());
            for call in calls {
                let output = self.invoke(&call).await?;
                let (id, name) = (call.id.clone(), call.name.clone());
                messages.push(Message::tool_call(call));
                messages.push(Message::tool(output, id, name));
            }
        }

        Err(Error::ToolDepth(self.max_depth))
    }

    /// One request and its decoded stream; returns the sealed tool calls.
    async fn cycle(
        &self,
        adapter: Adapter,
        messages: &[Message],
        result: &mut ChatResult,
    ) -> Result<Vec<ToolCall>> {
        let turn = Turn::new(self.profile, self.credentials, self.conversation, messages)
            .with_tools(self.tools)
            .with_continuation(result.continuation.as_ref());
        let payload = adapter.build_payload(&turn)?;
        let request = adapter.build_request(&turn, payload, self.link).await?;
        result.requests += 1;

        let response = adapter.open(request, self.link).await?;
        let mut reader = adapter.create_reader(response, self.link.cancel.clone());
        let outcome = self.drain(&mut reader, result).await;

        let state = reader.into_state();
        result.usage += state.usage;
        outcome?;

        for buffer in state.unsealed() {
            tracing::warn!(
                "dropping unsealed tool call {} ({}) at end of stream",
                buffer.name,
                buffer.id
            );
        }
        Ok(state.tool_calls())
    }

    async fn drain(&self, reader: &mut StreamReader, result: &mut ChatResult) -> Result<()> {
        while let Some(event) = reader.next().await {
            match event? {
                ChatEvent::ContentDelta { text } => {
                    self.callbacks.reading(&text, "");
                    result.reply.push_str(&text);
                }
                ChatEvent::ReasoningDelta { text } => {
                    self.callbacks.reading("", &text);
                    result.reasoning.push_str(&text);
                }
                ChatEvent::Continuation { token } => result.continuation = Some(token),
                ChatEvent::ProviderError { code, message } => {
                    return Err(Error::Provider { code, message });
                }
                ChatEvent::ToolCallStart { .. }
                | ChatEvent::ToolCallArgsDelta { .. }
                | ChatEvent::Usage(_)
                | ChatEvent::Finish { .. }
                | ChatEvent::Done => {}
            }
        }
        Ok(())
    }

    /// Execute `call` and return the text fed back to the model.
    ///
    /// Tool failures become the result; only an abort ends the chain.
    async fn invoke(&self, call: &ToolCall) -> Result<String> {
        self.callbacks.tool_calls(&call.name);
        let args = match call.parse_arguments() {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!("invalid arguments for {}: {e}", call.name);
                return Ok(format!("invalid arguments for {}: {e}", call.name));
            }
        };

        let (client, name) = call.split_name();
        let invocation = ToolInvocation {
            client: client.into(),
            name: name.into(),
            args,
        };
        tracing::debug!("dispatching tool call {} ({})", call.name, call.id);

        let cancel = self.link.cancel;
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = self.registry.call_tool(invocation) => Some(outcome),
        };
        let Some(outcome) = outcome else {
            return Err(Error::Aborted);
        };

        Ok(match outcome {
            Ok(output) => {
                if output.is_error {
                    tracing::debug!("tool {} reported an error", call.name);
                }
                output.content
            }
            Err(e) => {
                tracing::warn!("tool {} failed: {e}", call.name);
                e.to_string()
            }
        })
    }
}

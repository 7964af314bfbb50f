//! Tool registry contract.
//!
//! The registry process that starts and stops tool servers lives outside
//! the engine. Sessions only see [`ToolRegistry`]: call a tool, list the
//! tools on offer, activate a server. [`StaticRegistry`] serves in-process
//! handlers keyed by their namespaced name.

use compact_str::{CompactString, format_compact};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{collections::BTreeMap, future::Future, pin::Pin, sync::Arc};
use wcore::{Error, NAMESPACE_SEPARATOR, Result, Tool};

/// One tool invocation routed to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// The client (tool server) owning the tool.
    pub client: CompactString,
    /// The tool name within the client.
    pub name: CompactString,
    /// Parsed arguments.
    pub args: Value,
}

impl ToolInvocation {
    /// The namespaced `<client>--<tool>` name.
    pub fn qualified_name(&self) -> CompactString {
        if self.client.is_empty() {
            return self.name.clone();
        }
        format_compact!("{}{NAMESPACE_SEPARATOR}{}", self.client, self.name)
    }
}

/// What a tool returned.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// The tool reported a failure; `content` describes it.
    #[serde(rename = "isError", default)]
    pub is_error: bool,
    /// Stringified result.
    pub content: String,
}

impl ToolOutput {
    /// A successful result.
    pub fn ok(content: impl Into<String>) -> Self {
        Self {
            is_error: false,
            content: content.into(),
        }
    }

    /// A tool-reported failure.
    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            content: content.into(),
        }
    }
}

/// The external tool registry.
///
/// Must be safe to call from several sessions at once.
pub trait ToolRegistry: Send + Sync {
    /// Execute one tool call.
    fn call_tool(
        &self,
        invocation: ToolInvocation,
    ) -> impl Future<Output = Result<ToolOutput>> + Send;

    /// Tools currently on offer, with namespaced names.
    fn list_tools(&self) -> impl Future<Output = Result<Vec<Tool>>> + Send;

    /// Activate a tool server from its configuration.
    fn activate(&self, config: Value) -> impl Future<Output = Result<()>> + Send;
}

/// A type-erased async tool handler.
pub type Handler =
    Arc<dyn Fn(Value) -> Pin<Box<dyn Future<Output = ToolOutput> + Send>> + Send + Sync>;

/// Registry of in-process handlers.
#[derive(Default)]
pub struct StaticRegistry {
    tools: RwLock<BTreeMap<CompactString, (Tool, Handler)>>,
}

impl StaticRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool with its handler under the tool's namespaced name.
    pub fn register<F, Fut>(&self, tool: Tool, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolOutput> + Send + 'static,
    {
        let name = tool.name.clone();
        let handler: Handler = Arc::new(move |args| Box::pin(handler(args)));
        self.tools.write().insert(name, (tool, handler));
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.read().len()
    }

    /// Whether no tool is registered.
    pub fn is_empty(&self) -> bool {
        self.tools.read().is_empty()
    }
}

impl ToolRegistry for StaticRegistry {
    async fn call_tool(&self, invocation: ToolInvocation) -> Result<ToolOutput> {
        let name = invocation.qualified_name();
        let handler = self
            .tools
            .read()
            .get(&name)
            .map(|(_, handler)| handler.clone());
        let Some(handler) = handler else {
            return Err(Error::ToolExecution {
                name,
                message: "tool not available".into(),
            });
        };

        tracing::debug!("calling tool {name}");
        Ok(handler(invocation.args).await)
    }

    async fn list_tools(&self) -> Result<Vec<Tool>> {
        Ok(self
            .tools
            .read()
            .values()
            .map(|(tool, _)| tool.clone())
            .collect())
    }

    /// Handlers are live once registered; activation only checks that the
    /// named client has any.
    async fn activate(&self, config: Value) -> Result<()> {
        let Some(client) = config.get("name").and_then(Value::as_str) else {
            return Err(Error::Config("server config has no name".into()));
        };
        let prefix = format!("{client}{NAMESPACE_SEPARATOR}");
        if !self.tools.read().keys().any(|name| name.starts_with(&prefix)) {
            return Err(Error::Config(format!("no tools registered for {client}")));
        }
        tracing::debug!("activated tool client {client}");
        Ok(())
    }
}

//! Vendor adapters.
//!
//! [`Adapter`] is an enum over the concrete vendor adapters, selected by
//! the profile's vendor tag. Every adapter exposes the same four steps:
//! build the payload, wrap it in a request, open the response and create
//! the reader for its dialect.

use crate::{
    HttpRequest, HttpResponse, StreamReader, TokenCache, Transport,
    anthropic::Anthropic,
    baidu::Baidu,
    chatbro::ChatBro,
    google::Google,
    ollama::Ollama,
    openai::OpenAI,
    reader::Decoder,
    transport,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use wcore::{
    ConversationState, Credentials, Dialect, Message, ModelProfile, ProviderProfile, Result, Tool,
    ToolStyle, Vendor, Vision,
};

/// Everything a builder reads for one request.
#[derive(Debug, Clone, Copy)]
pub struct Turn<'a> {
    /// The vendor profile.
    pub profile: &'a ProviderProfile,
    /// Caller-supplied credentials.
    pub credentials: &'a Credentials,
    /// Conversation settings.
    pub conversation: &'a ConversationState,
    /// The request messages, history window included.
    pub messages: &'a [Message],
    /// Tools offered to the model.
    pub tools: &'a [Tool],
    /// Continuation token from the previous turn.
    pub continuation: Option<&'a Value>,
}

impl<'a> Turn<'a> {
    /// A turn without tools or continuation.
    pub fn new(
        profile: &'a ProviderProfile,
        credentials: &'a Credentials,
        conversation: &'a ConversationState,
        messages: &'a [Message],
    ) -> Self {
        Self {
            profile,
            credentials,
            conversation,
            messages,
            tools: &[],
            continuation: None,
        }
    }

    /// Offer `tools` to the model.
    pub fn with_tools(mut self, tools: &'a [Tool]) -> Self {
        self.tools = tools;
        self
    }

    /// Replay a continuation token.
    pub fn with_continuation(mut self, continuation: Option<&'a Value>) -> Self {
        self.continuation = continuation;
        self
    }

    /// The model the caller asked for, before remapping.
    ///
    /// The conversation wins over the credential override, which wins over
    /// the catalog default.
    pub fn requested_model(&self) -> &'a str {
        let conversation = self.conversation.model.trim();
        if !conversation.is_empty() {
            return conversation;
        }
        let credential = self.credentials.model.trim();
        if !credential.is_empty() {
            return credential;
        }
        self.profile
            .default_model()
            .map(|model| model.name)
            .unwrap_or_default()
    }

    /// The model identifier sent on the wire.
    pub fn model_name(&self) -> &'a str {
        self.credentials.map_model(self.requested_model())
    }

    /// Catalog entry of the requested model.
    pub fn model(&self) -> Option<&'static ModelProfile> {
        self.profile.model(self.requested_model())
    }

    /// Image support of the model; unknown models get none.
    pub fn vision(&self) -> Option<Vision> {
        self.model().and_then(|model| model.vision)
    }

    /// Temperature clamped into the vendor's bounds, if it takes one.
    pub fn temperature(&self) -> Option<f32> {
        let bounds = self.profile.temperature?;
        let value = self.conversation.temperature.unwrap_or(bounds.default);
        Some(bounds.clamp(value))
    }

    /// Max output tokens, capped at the model's limit.
    pub fn max_tokens(&self) -> Option<u32> {
        let limit = match self.model() {
            Some(model) => model.max_tokens?,
            None => u32::MAX,
        };
        self.conversation.max_tokens.map(|n| n.min(limit))
    }

    /// Whether to ask for a streamed answer.
    pub fn stream(&self) -> bool {
        self.conversation.stream && self.model().is_none_or(|model| model.streaming)
    }

    /// The system message, if set.
    pub fn system(&self) -> Option<&'a str> {
        let system = self.conversation.system_message.trim();
        (!system.is_empty()).then_some(system)
    }

    /// Whether tools go into this request.
    pub fn tools_enabled(&self) -> bool {
        !self.tools.is_empty()
            && self.profile.tool_style != ToolStyle::None
            && self.model().is_none_or(|model| model.tools)
    }

    /// The tool manifest in the vendor's schema.
    pub fn tools_manifest(&self) -> Option<Value> {
        if !self.tools_enabled() {
            return None;
        }

        let declarations = || {
            self.tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.input_schema,
                    })
                })
                .collect::<Vec<_>>()
        };
        let manifest: Value = match self.profile.tool_style {
            ToolStyle::None => return None,
            ToolStyle::Function => self
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.input_schema,
                        },
                    })
                })
                .collect(),
            ToolStyle::InputSchema => self
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "name": tool.name,
                        "description": tool.description,
                        "input_schema": tool.input_schema,
                    })
                })
                .collect(),
            ToolStyle::FunctionDeclarations => json!([{ "functionDeclarations": declarations() }]),
            ToolStyle::BareFunctions => Value::Array(declarations()),
        };
        Some(manifest)
    }

    /// The request URL with `{model}` and `{deployment}` substituted.
    pub fn url(&self) -> String {
        let path = self
            .profile
            .path
            .replace("{model}", self.model_name())
            .replace("{deployment}", self.credentials.deployment.trim());
        format!("{}{path}", self.profile.base_url(self.credentials))
    }

    /// A JSON `POST` to [`Turn::url`] carrying the credential.
    pub fn post(&self, payload: Value) -> Result<HttpRequest> {
        HttpRequest::post(self.url(), payload)
            .authorize(self.profile.auth, self.credentials.key.trim())
    }
}

/// I/O handles for the steps that touch the network.
pub struct Link<'a, T> {
    /// The transport.
    pub transport: &'a T,
    /// Shared access-token cache.
    pub tokens: &'a TokenCache,
    /// The turn's abort signal.
    pub cancel: &'a CancellationToken,
}

impl<T> Clone for Link<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Link<'_, T> {}

/// A vendor adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adapter {
    /// OpenAI-compatible chat completions.
    OpenAI(OpenAI),
    /// Anthropic messages.
    Anthropic(Anthropic),
    /// Google Gemini.
    Google(Google),
    /// Baidu ERNIE.
    Baidu(Baidu),
    /// Ollama generate.
    Ollama(Ollama),
    /// ChatBro stream handles.
    ChatBro(ChatBro),
}

impl Adapter {
    /// The adapter for `profile`.
    pub fn new(profile: &ProviderProfile) -> Self {
        match profile.vendor {
            Vendor::Anthropic => Self::Anthropic(Anthropic),
            Vendor::Google => Self::Google(Google),
            Vendor::Baidu => Self::Baidu(Baidu),
            Vendor::Ollama => Self::Ollama(Ollama),
            Vendor::ChatBro => Self::ChatBro(ChatBro),
            Vendor::OpenAI
            | Vendor::Azure
            | Vendor::Mistral
            | Vendor::Grok
            | Vendor::DeepSeek
            | Vendor::Moonshot
            | Vendor::Doubao
            | Vendor::Zhipu
            | Vendor::Perplexity
            | Vendor::LmStudio => Self::OpenAI(OpenAI),
        }
    }

    /// The wire dialect the adapter reads.
    pub fn dialect(&self) -> Dialect {
        match self {
            Self::OpenAI(_) | Self::ChatBro(_) => Dialect::EventStream,
            Self::Anthropic(_) => Dialect::TypedEvent,
            Self::Google(_) => Dialect::RawArray,
            Self::Baidu(_) => Dialect::MarkedJson,
            Self::Ollama(_) => Dialect::NdJson,
        }
    }

    /// Build the vendor payload for `turn`.
    pub fn build_payload(&self, turn: &Turn<'_>) -> Result<Value> {
        let payload = match self {
            Self::OpenAI(a) => a.payload(turn),
            Self::ChatBro(a) => a.payload(turn),
            Self::Anthropic(a) => a.payload(turn),
            Self::Google(a) => a.payload(turn),
            Self::Baidu(a) => a.payload(turn),
            Self::Ollama(a) => a.payload(turn),
        }?;
        tracing::trace!("payload: {payload}");
        Ok(payload)
    }

    /// Wrap `payload` in a request, refreshing an access token if the
    /// vendor needs one.
    pub async fn build_request<T: Transport>(
        &self,
        turn: &Turn<'_>,
        payload: Value,
        link: Link<'_, T>,
    ) -> Result<HttpRequest> {
        match self {
            Self::OpenAI(a) => a.request(turn, payload),
            Self::ChatBro(a) => a.request(turn, payload),
            Self::Anthropic(a) => a.request(turn, payload),
            Self::Google(a) => a.request(turn, payload),
            Self::Ollama(a) => a.request(turn, payload),
            Self::Baidu(a) => a.request(turn, payload, link).await,
        }
    }

    /// Send `request` and return the response to read events from.
    pub async fn open<T: Transport>(
        &self,
        request: HttpRequest,
        link: Link<'_, T>,
    ) -> Result<HttpResponse> {
        match self {
            Self::ChatBro(a) => a.open(request, link).await,
            _ => transport::send(link.transport, request, link.cancel).await,
        }
    }

    /// A reader decoding `response` in the adapter's dialect.
    pub fn create_reader(&self, response: HttpResponse, cancel: CancellationToken) -> StreamReader {
        StreamReader::new(Decoder::new(self.dialect()), response, cancel)
    }
}

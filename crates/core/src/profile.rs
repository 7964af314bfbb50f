//! Static provider descriptors
//!
//! A [`ProviderProfile`] is read-only data: endpoint schema, credential
//! requirements, model catalog and parameter bounds. Profiles live in the
//! provider crate's catalog and are shared freely between sessions.

use crate::{Credentials, Field};

/// The vendor a profile describes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Vendor {
    OpenAI,
    Azure,
    Anthropic,
    Google,
    Mistral,
    Grok,
    DeepSeek,
    Moonshot,
    Doubao,
    Zhipu,
    Perplexity,
    LmStudio,
    ChatBro,
    Baidu,
    Ollama,
}

/// The wire dialect a vendor streams its response in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// `data:`-prefixed lines terminated by `[DONE]`
    EventStream,
    /// Frames with an explicit `type` discriminator
    TypedEvent,
    /// A streamed JSON array without per-event framing
    RawArray,
    /// Marked JSON lines, unmarked lines are error objects
    MarkedJson,
    /// Newline-delimited complete documents
    NdJson,
}

/// Where the credential goes on the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Auth {
    /// No credential
    None,
    /// `Authorization: Bearer <key>`
    Bearer,
    /// `<header>: <key>`
    Header(&'static str),
    /// `?<param>=<key>` on the URL
    Query(&'static str),
    /// Client-credential token exchanged at `token_path`, sent as
    /// `?access_token=<token>`
    OAuth2 { token_path: &'static str },
}

/// The shape the tool manifest is rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolStyle {
    /// The vendor does not accept tools
    None,
    /// `{type:"function", function:{name,description,parameters}}`
    Function,
    /// `{name,description,input_schema}`
    InputSchema,
    /// `[{functionDeclarations:[{name,description,parameters}]}]`
    FunctionDeclarations,
    /// `[{name,description,parameters}]`
    BareFunctions,
}

/// A parameter interval; either end may be open
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Inclusive lower bound
    pub min: Option<f32>,
    /// Inclusive upper bound
    pub max: Option<f32>,
    /// Value used when the conversation sets none
    pub default: f32,
}

impl Bounds {
    /// Closed interval `[min, max]`
    pub const fn closed(min: f32, max: f32, default: f32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
            default,
        }
    }

    /// Clamp `value` into the interval
    pub fn clamp(&self, value: f32) -> f32 {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }
}

/// Image input support of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vision {
    /// Images may be referenced by URL
    pub allow_url: bool,
    /// Images may be inlined as base64
    pub allow_base64: bool,
}

/// One entry of a vendor's model catalog
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelProfile {
    /// Model identifier sent to the vendor
    pub name: &'static str,
    /// Context window in tokens
    pub context_window: u32,
    /// Max output tokens; `None` when the vendor takes no such parameter
    pub max_tokens: Option<u32>,
    /// Price per 1K input tokens (USD)
    pub input_price: f64,
    /// Price per 1K output tokens (USD)
    pub output_price: f64,
    /// Image input support
    pub vision: Option<Vision>,
    /// Whether the model accepts tools
    pub tools: bool,
    /// Whether the model streams its answer
    pub streaming: bool,
    /// The vendor's default model
    pub is_default: bool,
}

/// Read-only descriptor of one vendor
#[derive(Debug, Clone, Copy)]
pub struct ProviderProfile {
    /// The vendor tag
    pub vendor: Vendor,
    /// Display and lookup name
    pub name: &'static str,
    /// Default base URL
    pub base: &'static str,
    /// Chat path template; `{model}` and `{deployment}` are substituted
    pub path: &'static str,
    /// Credential placement
    pub auth: Auth,
    /// Response wire dialect
    pub dialect: Dialect,
    /// Tool manifest shape
    pub tool_style: ToolStyle,
    /// Credential fields that must be non-blank (`apiSchema`)
    pub schema: &'static [Field],
    /// Temperature interval; `None` when the vendor takes no temperature
    pub temperature: Option<Bounds>,
    /// Whether to ask for usage in the stream (`stream_options`)
    pub stream_usage: bool,
    /// Whether models outside the catalog are accepted
    pub model_customizable: bool,
    /// Model catalog
    pub models: &'static [ModelProfile],
}

impl ProviderProfile {
    /// Look up a model in the catalog
    pub fn model(&self, name: &str) -> Option<&'static ModelProfile> {
        self.models.iter().find(|model| model.name == name)
    }

    /// The default model of the catalog
    pub fn default_model(&self) -> Option<&'static ModelProfile> {
        self.models
            .iter()
            .find(|model| model.is_default)
            .or_else(|| self.models.first())
    }

    /// Whether every required credential field is non-blank
    pub fn is_ready(&self, credentials: &Credentials) -> bool {
        self.schema
            .iter()
            .all(|field| !credentials.get(*field).trim().is_empty())
    }

    /// Base URL: the credential override or the profile default
    pub fn base_url<'a>(&'a self, credentials: &'a Credentials) -> &'a str {
        let base = credentials.base.trim();
        let base = if base.is_empty() { self.base } else { base };
        base.trim_end_matches('/')
    }
}

//! Static provider catalog.
//!
//! One [`ProviderProfile`] per supported vendor. Profiles are plain
//! `'static` data and are shared freely between sessions.

use wcore::{
    Auth, Bounds, Dialect, Field, ModelProfile, ProviderProfile, ToolStyle, Vendor, Vision,
};

const URL_OR_DATA: Vision = Vision {
    allow_url: true,
    allow_base64: true,
};

const DATA_ONLY: Vision = Vision {
    allow_url: false,
    allow_base64: true,
};

const fn model(
    name: &'static str,
    context_window: u32,
    max_tokens: u32,
    input_price: f64,
    output_price: f64,
) -> ModelProfile {
    ModelProfile {
        name,
        context_window,
        max_tokens: Some(max_tokens),
        input_price,
        output_price,
        vision: None,
        tools: true,
        streaming: true,
        is_default: false,
    }
}

const fn default(mut model: ModelProfile) -> ModelProfile {
    model.is_default = true;
    model
}

const fn seeing(mut model: ModelProfile, vision: Vision) -> ModelProfile {
    model.vision = Some(vision);
    model
}

const fn toolless(mut model: ModelProfile) -> ModelProfile {
    model.tools = false;
    model
}

const fn batch(mut model: ModelProfile) -> ModelProfile {
    model.streaming = false;
    model
}

const KEY: &[Field] = &[Field::Key];

const OPENAI_MODELS: &[ModelProfile] = &[
    default(seeing(
        model("gpt-4o", 128_000, 16_384, 0.0025, 0.01),
        URL_OR_DATA,
    )),
    seeing(
        model("gpt-4o-mini", 128_000, 16_384, 0.00015, 0.0006),
        URL_OR_DATA,
    ),
    seeing(
        model("gpt-4.1", 1_047_576, 32_768, 0.002, 0.008),
        URL_OR_DATA,
    ),
    batch(model("o1", 200_000, 100_000, 0.015, 0.06)),
    model("o3-mini", 200_000, 100_000, 0.0011, 0.0044),
];

/// OpenAI chat completions.
pub const OPENAI: ProviderProfile = ProviderProfile {
    vendor: Vendor::OpenAI,
    name: "OpenAI",
    base: "https://api.openai.com",
    path: "/v1/chat/completions",
    auth: Auth::Bearer,
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::Function,
    schema: KEY,
    temperature: Some(Bounds::closed(0.0, 2.0, 1.0)),
    stream_usage: true,
    model_customizable: true,
    models: OPENAI_MODELS,
};

/// Azure OpenAI; the deployment id replaces the model in the path.
pub const AZURE: ProviderProfile = ProviderProfile {
    vendor: Vendor::Azure,
    name: "Azure",
    base: "",
    path: "/openai/deployments/{deployment}/chat/completions?api-version=2024-10-21",
    auth: Auth::Header("api-key"),
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::Function,
    schema: &[Field::Base, Field::Key, Field::Deployment],
    temperature: Some(Bounds::closed(0.0, 2.0, 1.0)),
    stream_usage: true,
    model_customizable: true,
    models: OPENAI_MODELS,
};

/// Anthropic messages.
pub const ANTHROPIC: ProviderProfile = ProviderProfile {
    vendor: Vendor::Anthropic,
    name: "Anthropic",
    base: "https://api.anthropic.com",
    path: "/v1/messages",
    auth: Auth::Header("x-api-key"),
    dialect: Dialect::TypedEvent,
    tool_style: ToolStyle::InputSchema,
    schema: KEY,
    temperature: Some(Bounds::closed(0.0, 1.0, 1.0)),
    stream_usage: false,
    model_customizable: true,
    models: &[
        default(seeing(
            model("claude-sonnet-4-5", 200_000, 64_000, 0.003, 0.015),
            URL_OR_DATA,
        )),
        seeing(
            model("claude-opus-4-1", 200_000, 32_000, 0.015, 0.075),
            URL_OR_DATA,
        ),
        seeing(
            model("claude-3-5-haiku-latest", 200_000, 8_192, 0.0008, 0.004),
            URL_OR_DATA,
        ),
    ],
};

/// Google Gemini `streamGenerateContent`, streamed as a raw JSON array.
pub const GOOGLE: ProviderProfile = ProviderProfile {
    vendor: Vendor::Google,
    name: "Google",
    base: "https://generativelanguage.googleapis.com",
    path: "/v1beta/models/{model}:streamGenerateContent",
    auth: Auth::Query("key"),
    dialect: Dialect::RawArray,
    tool_style: ToolStyle::FunctionDeclarations,
    schema: KEY,
    temperature: Some(Bounds::closed(0.0, 2.0, 1.0)),
    stream_usage: false,
    model_customizable: true,
    models: &[
        default(seeing(
            model("gemini-2.5-flash", 1_048_576, 65_536, 0.0003, 0.0025),
            DATA_ONLY,
        )),
        seeing(
            model("gemini-2.5-pro", 1_048_576, 65_536, 0.00125, 0.01),
            DATA_ONLY,
        ),
        seeing(
            model("gemini-2.0-flash", 1_048_576, 8_192, 0.0001, 0.0004),
            DATA_ONLY,
        ),
    ],
};

/// Mistral La Plateforme.
pub const MISTRAL: ProviderProfile = ProviderProfile {
    vendor: Vendor::Mistral,
    name: "Mistral",
    base: "https://api.mistral.ai",
    path: "/v1/chat/completions",
    auth: Auth::Bearer,
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::Function,
    schema: KEY,
    temperature: Some(Bounds::closed(0.0, 1.5, 0.7)),
    stream_usage: false,
    model_customizable: false,
    models: &[
        default(model("mistral-large-latest", 128_000, 8_192, 0.002, 0.006)),
        model("mistral-small-latest", 32_000, 8_192, 0.0002, 0.0006),
        seeing(
            model("pixtral-large-latest", 128_000, 8_192, 0.002, 0.006),
            URL_OR_DATA,
        ),
    ],
};

/// xAI Grok.
pub const GROK: ProviderProfile = ProviderProfile {
    vendor: Vendor::Grok,
    name: "Grok",
    base: "https://api.x.ai",
    path: "/v1/chat/completions",
    auth: Auth::Bearer,
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::Function,
    schema: KEY,
    temperature: Some(Bounds::closed(0.0, 2.0, 1.0)),
    stream_usage: true,
    model_customizable: false,
    models: &[
        default(model("grok-3", 131_072, 16_384, 0.003, 0.015)),
        model("grok-3-mini", 131_072, 16_384, 0.0003, 0.0005),
        seeing(
            model("grok-2-vision-1212", 32_768, 8_192, 0.002, 0.01),
            URL_OR_DATA,
        ),
    ],
};

/// DeepSeek.
pub const DEEPSEEK: ProviderProfile = ProviderProfile {
    vendor: Vendor::DeepSeek,
    name: "DeepSeek",
    base: "https://api.deepseek.com",
    path: "/chat/completions",
    auth: Auth::Bearer,
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::Function,
    schema: KEY,
    temperature: Some(Bounds::closed(0.0, 2.0, 1.0)),
    stream_usage: true,
    model_customizable: false,
    models: &[
        default(model("deepseek-chat", 65_536, 8_192, 0.00027, 0.0011)),
        toolless(model("deepseek-reasoner", 65_536, 8_192, 0.00055, 0.00219)),
    ],
};

/// Moonshot Kimi.
pub const MOONSHOT: ProviderProfile = ProviderProfile {
    vendor: Vendor::Moonshot,
    name: "Moonshot",
    base: "https://api.moonshot.cn",
    path: "/v1/chat/completions",
    auth: Auth::Bearer,
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::Function,
    schema: KEY,
    temperature: Some(Bounds::closed(0.0, 1.0, 0.3)),
    stream_usage: false,
    model_customizable: false,
    models: &[
        default(model("moonshot-v1-8k", 8_192, 4_096, 0.0017, 0.0017)),
        model("moonshot-v1-32k", 32_768, 4_096, 0.0033, 0.0033),
        model("moonshot-v1-128k", 131_072, 4_096, 0.0083, 0.0083),
    ],
};

/// Volcengine Doubao; the endpoint id replaces the model in the path.
pub const DOUBAO: ProviderProfile = ProviderProfile {
    vendor: Vendor::Doubao,
    name: "Doubao",
    base: "https://ark.cn-beijing.volces.com",
    path: "/api/v3/deployments/{deployment}/chat/completions",
    auth: Auth::Bearer,
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::Function,
    schema: &[Field::Key, Field::Deployment],
    temperature: Some(Bounds::closed(0.0, 1.0, 0.7)),
    stream_usage: true,
    model_customizable: true,
    models: &[
        default(model("doubao-pro-32k", 32_768, 4_096, 0.0001, 0.0003)),
        model("doubao-lite-32k", 32_768, 4_096, 0.00004, 0.0001),
    ],
};

/// Zhipu GLM.
pub const ZHIPU: ProviderProfile = ProviderProfile {
    vendor: Vendor::Zhipu,
    name: "Zhipu",
    base: "https://open.bigmodel.cn",
    path: "/api/paas/v4/chat/completions",
    auth: Auth::Bearer,
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::Function,
    schema: KEY,
    temperature: Some(Bounds {
        min: Some(0.01),
        max: Some(0.99),
        default: 0.95,
    }),
    stream_usage: false,
    model_customizable: false,
    models: &[
        default(model("glm-4-plus", 128_000, 4_096, 0.007, 0.007)),
        model("glm-4-flash", 128_000, 4_096, 0.0, 0.0),
        seeing(model("glm-4v-plus", 8_192, 1_024, 0.0014, 0.0014), URL_OR_DATA),
    ],
};

/// Perplexity sonar.
pub const PERPLEXITY: ProviderProfile = ProviderProfile {
    vendor: Vendor::Perplexity,
    name: "Perplexity",
    base: "https://api.perplexity.ai",
    path: "/chat/completions",
    auth: Auth::Bearer,
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::None,
    schema: KEY,
    temperature: Some(Bounds {
        min: Some(0.0),
        max: None,
        default: 0.2,
    }),
    stream_usage: false,
    model_customizable: false,
    models: &[
        default(toolless(model("sonar", 127_072, 8_000, 0.001, 0.001))),
        toolless(model("sonar-pro", 200_000, 8_000, 0.003, 0.015)),
        toolless(model("sonar-reasoning", 127_072, 8_000, 0.001, 0.005)),
    ],
};

/// LM Studio local server.
pub const LM_STUDIO: ProviderProfile = ProviderProfile {
    vendor: Vendor::LmStudio,
    name: "LMStudio",
    base: "http://localhost:1234",
    path: "/v1/chat/completions",
    auth: Auth::None,
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::Function,
    schema: &[Field::Base],
    temperature: Some(Bounds::closed(0.0, 2.0, 0.8)),
    stream_usage: false,
    model_customizable: true,
    models: &[default(model("local-model", 8_192, 4_096, 0.0, 0.0))],
};

/// ChatBro; a handle request precedes the streaming GET.
pub const CHATBRO: ProviderProfile = ProviderProfile {
    vendor: Vendor::ChatBro,
    name: "ChatBro",
    base: "https://api.chatbro.ai",
    path: "/v1/chat/streams",
    auth: Auth::Bearer,
    dialect: Dialect::EventStream,
    tool_style: ToolStyle::Function,
    schema: KEY,
    temperature: Some(Bounds::closed(0.0, 2.0, 1.0)),
    stream_usage: false,
    model_customizable: true,
    models: &[
        default(seeing(
            model("gpt-4o", 128_000, 16_384, 0.0025, 0.01),
            URL_OR_DATA,
        )),
        model("gpt-4o-mini", 128_000, 16_384, 0.00015, 0.0006),
    ],
};

/// Baidu ERNIE, authenticated by a client-credential token.
pub const BAIDU: ProviderProfile = ProviderProfile {
    vendor: Vendor::Baidu,
    name: "Baidu",
    base: "https://aip.baidubce.com",
    path: "/rpc/2.0/ai_custom/v1/wenxinworkshop/chat/{model}",
    auth: Auth::OAuth2 {
        token_path: "/oauth/2.0/token",
    },
    dialect: Dialect::MarkedJson,
    tool_style: ToolStyle::BareFunctions,
    schema: &[Field::Key, Field::Secret],
    temperature: Some(Bounds {
        min: Some(0.01),
        max: Some(1.0),
        default: 0.8,
    }),
    stream_usage: false,
    model_customizable: true,
    models: &[
        default(model("completions_pro", 8_192, 2_048, 0.004, 0.008)),
        model("ernie-speed-128k", 131_072, 4_096, 0.0, 0.0),
        toolless(model("ernie-lite-8k", 8_192, 2_048, 0.0, 0.0)),
    ],
};

/// Ollama `/api/generate`, continued through an opaque context token.
pub const OLLAMA: ProviderProfile = ProviderProfile {
    vendor: Vendor::Ollama,
    name: "Ollama",
    base: "http://localhost:11434",
    path: "/api/generate",
    auth: Auth::None,
    dialect: Dialect::NdJson,
    tool_style: ToolStyle::None,
    schema: &[Field::Base],
    temperature: Some(Bounds::closed(0.0, 2.0, 0.8)),
    stream_usage: false,
    model_customizable: true,
    models: &[
        default(toolless(model("llama3.2", 131_072, 4_096, 0.0, 0.0))),
        toolless(model("qwen3", 40_960, 4_096, 0.0, 0.0)),
        toolless(seeing(model("llava", 4_096, 2_048, 0.0, 0.0), DATA_ONLY)),
    ],
};

/// Every profile in the catalog.
pub static PROVIDERS: &[ProviderProfile] = &[
    OPENAI, AZURE, ANTHROPIC, GOOGLE, MISTRAL, GROK, DEEPSEEK, MOONSHOT, DOUBAO, ZHIPU,
    PERPLEXITY, LM_STUDIO, CHATBRO, BAIDU, OLLAMA,
];

/// Look up a profile by name, ignoring case.
pub fn find(name: &str) -> Option<&'static ProviderProfile> {
    PROVIDERS
        .iter()
        .find(|profile| profile.name.eq_ignore_ascii_case(name.trim()))
}

/// Every profile in catalog order.
pub fn all() -> &'static [ProviderProfile] {
    PROVIDERS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_vendor_has_one_default_model() {
        for profile in all() {
            let defaults = profile.models.iter().filter(|m| m.is_default).count();
            assert_eq!(defaults, 1, "{}", profile.name);
        }
    }

    #[test]
    fn find_ignores_case() {
        assert_eq!(find("deepseek").map(|p| p.vendor), Some(Vendor::DeepSeek));
        assert_eq!(find(" lmstudio ").map(|p| p.vendor), Some(Vendor::LmStudio));
        assert!(find("nope").is_none());
    }
}

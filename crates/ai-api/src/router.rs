//! Model-name routing to one of the three upstream protocol families.

/// Default base URL for the native-alternate (Anthropic Messages) family.
pub const DEFAULT_NATIVE_BASE_URL: &str = "https://api.proxyapi.ru/anthropic";

/// Default base URL for OpenAI models addressed as `openai/...`.
pub const DEFAULT_DIRECT_BASE_URL: &str = "https://api.proxyapi.ru/openai/v1";

/// Default base URL for every other model (OpenRouter-style relay).
pub const DEFAULT_RELAY_BASE_URL: &str = "https://api.proxyapi.ru/openrouter/v1";

/// Upstream protocol dialect a model is served through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderFamily {
    /// Anthropic-style Messages API behind a blocking client.
    NativeAlt,
    /// OpenAI chat completions for `openai/...` models.
    OpenAiCompatDirect,
    /// OpenAI-compatible relay for everything else.
    OpenAiCompatRelay,
}

impl ProviderFamily {
    /// Classify a model identifier. Case-insensitive, first match wins, and
    /// every string classifies.
    pub fn classify(model: &str) -> Self {
        let lower = model.to_lowercase();
        if lower.contains("claude") || lower.contains("anthropic") {
            ProviderFamily::NativeAlt
        } else if lower.starts_with("openai/") {
            ProviderFamily::OpenAiCompatDirect
        } else {
            ProviderFamily::OpenAiCompatRelay
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderFamily::NativeAlt => "native",
            ProviderFamily::OpenAiCompatDirect => "openai",
            ProviderFamily::OpenAiCompatRelay => "relay",
        }
    }
}

/// Base URL per provider family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub native: String,
    pub direct: String,
    pub relay: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            native: DEFAULT_NATIVE_BASE_URL.to_string(),
            direct: DEFAULT_DIRECT_BASE_URL.to_string(),
            relay: DEFAULT_RELAY_BASE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// The base URL serving `family`.
    pub fn base_url(&self, family: ProviderFamily) -> &str {
        match family {
            ProviderFamily::NativeAlt => &self.native,
            ProviderFamily::OpenAiCompatDirect => &self.direct,
            ProviderFamily::OpenAiCompatRelay => &self.relay,
        }
    }

    /// Resolve the endpoint for a model identifier.
    pub fn for_model(&self, model: &str) -> &str {
        self.base_url(ProviderFamily::classify(model))
    }
}

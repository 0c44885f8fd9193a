//! Gateway configuration from the environment, plus the local user profile.

pub mod profile;

pub use profile::{greeting_for, ProfileStore, SaveOutcome, UserProfile, GENERIC_GREETING};

/// Azure deployment used when `AZURE_OPENAI_DEPLOYMENT` is unset.
pub const DEFAULT_AZURE_DEPLOYMENT: &str = "gpt-4.1-mini";
pub const DEFAULT_AZURE_API_VERSION: &str = "2024-12-01-preview";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-3-5-sonnet-20241022";
/// Backend chosen when neither `--backend` nor `VOICEGIT_BACKEND` is given.
pub const DEFAULT_BACKEND: &str = "azure";

/// Azure OpenAI credentials and deployment.
#[derive(Clone, PartialEq)]
pub struct AzureConfig {
    pub api_key: Option<String>,
    pub endpoint: Option<String>,
    pub deployment: String,
    pub api_version: String,
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: None,
            deployment: DEFAULT_AZURE_DEPLOYMENT.to_string(),
            api_version: DEFAULT_AZURE_API_VERSION.to_string(),
        }
    }
}

/// Anthropic credentials and model.
#[derive(Clone, PartialEq)]
pub struct AnthropicConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: Option<String>,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_ANTHROPIC_MODEL.to_string(),
            base_url: None,
        }
    }
}

/// Command line of the MCP tool server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct McpServerConfig {
    pub command: Option<String>,
    pub args: Vec<String>,
}

/// Everything the gateway reads from its environment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GatewayConfig {
    pub backend: Option<String>,
    pub azure: AzureConfig,
    pub anthropic: AnthropicConfig,
    pub mcp: McpServerConfig,
}

impl GatewayConfig {
    /// Load from process environment (after `.env`, if present).
    pub fn from_env() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "failed to load .env");
            }
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let mut config = Self {
            backend: get("VOICEGIT_BACKEND"),
            ..Self::default()
        };

        config.azure.api_key = get("AZURE_OPENAI_API_KEY");
        config.azure.endpoint = get("AZURE_OPENAI_ENDPOINT");
        if let Some(deployment) = get("AZURE_OPENAI_DEPLOYMENT") {
            config.azure.deployment = deployment;
        }
        if let Some(version) = get("AZURE_OPENAI_API_VERSION").or_else(|| get("OPENAI_API_VERSION")) {
            config.azure.api_version = version;
        }

        config.anthropic.api_key = get("ANTHROPIC_API_KEY");
        config.anthropic.base_url = get("ANTHROPIC_BASE_URL");
        if let Some(model) = get("ANTHROPIC_MODEL") {
            config.anthropic.model = model;
        }

        config.mcp.command = get("VOICEGIT_MCP_COMMAND");
        config.mcp.args = get("VOICEGIT_MCP_ARGS")
            .map(|raw| raw.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        config
    }

    /// Backend identifier to use when none is given on the command line.
    pub fn default_backend(&self) -> &str {
        self.backend.as_deref().unwrap_or(DEFAULT_BACKEND)
    }
}

fn redact(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "<set>"
    } else {
        "<unset>"
    }
}

impl std::fmt::Debug for AzureConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureConfig")
            .field("api_key", &redact(&self.api_key))
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl std::fmt::Debug for AnthropicConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicConfig")
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

//! Backend selection: which model serves a turn, with what instructions and tools.

use std::sync::Arc;

use strum::Display;

use crate::agent_loop::StreamVariant;
use crate::config::{AnthropicConfig, AzureConfig, GatewayConfig};
use crate::error::{Result, VoiceGitError};
use crate::provider::{AnthropicProvider, AzureOpenAiProvider, ModelProvider};
use crate::tools::ToolRegistry;
use crate::types::GenerationSettings;

/// Instruction every backend runs under.
pub const SYSTEM_PROMPT: &str = "You are a Git agent that carries out Git and GitHub actions on behalf of the user. \
When a request concerns the user themself (who they are, their repositories, their organizations), \
first look up their identity with the identity tool (get_me or get_authenticated_user) and use the result to answer.";

/// Transport retries for the Azure deployment.
pub const AZURE_MAX_RETRIES: u32 = 6;
/// Nucleus sampling for the Azure deployment.
pub const AZURE_TOP_P: f64 = 0.8;

/// Canonical backend identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BackendKind {
    #[strum(to_string = "azure")]
    AzureOpenAi,
    #[strum(to_string = "anthropic")]
    Anthropic,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::AzureOpenAi, BackendKind::Anthropic];

    /// Parse an identifier or alias, ignoring case and surrounding whitespace.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "azure" | "azure-openai" | "azure_openai" | "openai" => Some(Self::AzureOpenAi),
            "anthropic" | "claude" | "aws" | "bedrock" => Some(Self::Anthropic),
            _ => None,
        }
    }

    pub fn stream_variant(self) -> StreamVariant {
        match self {
            Self::AzureOpenAi => StreamVariant::MessageBuffered,
            Self::Anthropic => StreamVariant::SegmentStreaming,
        }
    }
}

/// A backend with its construction parameters fully resolved.
#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    AzureOpenAi(AzureSettings),
    Anthropic(AnthropicSettings),
}

#[derive(Clone, PartialEq)]
pub struct AzureSettings {
    pub api_key: String,
    pub endpoint: String,
    pub deployment: String,
    pub api_version: String,
}

#[derive(Clone, PartialEq)]
pub struct AnthropicSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for AzureSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureSettings")
            .field("endpoint", &self.endpoint)
            .field("deployment", &self.deployment)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl std::fmt::Debug for AnthropicSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicSettings")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl Backend {
    /// Resolve credentials for `kind` from `config`.
    pub fn resolve(kind: BackendKind, config: &GatewayConfig) -> Result<Self> {
        match kind {
            BackendKind::AzureOpenAi => azure_settings(&config.azure).map(Self::AzureOpenAi),
            BackendKind::Anthropic => anthropic_settings(&config.anthropic).map(Self::Anthropic),
        }
    }

    pub fn kind(&self) -> BackendKind {
        match self {
            Self::AzureOpenAi(_) => BackendKind::AzureOpenAi,
            Self::Anthropic(_) => BackendKind::Anthropic,
        }
    }

    fn provider(&self) -> Arc<dyn ModelProvider> {
        match self {
            Self::AzureOpenAi(s) => Arc::new(
                AzureOpenAiProvider::new(&s.endpoint, &s.deployment, &s.api_key, &s.api_version)
                    .with_max_retries(AZURE_MAX_RETRIES),
            ),
            Self::Anthropic(s) => Arc::new(AnthropicProvider::new(
                s.model.clone(),
                s.api_key.clone(),
                s.base_url.clone(),
            )),
        }
    }

    fn settings(&self) -> GenerationSettings {
        match self {
            Self::AzureOpenAi(_) => GenerationSettings {
                top_p: Some(AZURE_TOP_P),
                ..GenerationSettings::deterministic()
            },
            Self::Anthropic(_) => GenerationSettings::deterministic(),
        }
    }

    /// Bind this backend to the shared tool set.
    pub fn into_handle(self, tools: ToolRegistry) -> BackendHandle {
        BackendHandle {
            provider: self.provider(),
            system_prompt: SYSTEM_PROMPT.to_string(),
            tools,
            settings: self.settings(),
            variant: self.kind().stream_variant(),
        }
    }
}

fn azure_settings(config: &AzureConfig) -> Result<AzureSettings> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        VoiceGitError::Configuration("azure backend needs AZURE_OPENAI_API_KEY".into())
    })?;
    let endpoint = config.endpoint.clone().ok_or_else(|| {
        VoiceGitError::Configuration("azure backend needs AZURE_OPENAI_ENDPOINT".into())
    })?;
    Ok(AzureSettings {
        api_key,
        endpoint,
        deployment: config.deployment.clone(),
        api_version: config.api_version.clone(),
    })
}

fn anthropic_settings(config: &AnthropicConfig) -> Result<AnthropicSettings> {
    let api_key = config.api_key.clone().ok_or_else(|| {
        VoiceGitError::Configuration("anthropic backend needs ANTHROPIC_API_KEY".into())
    })?;
    Ok(AnthropicSettings {
        api_key,
        model: config.model.clone(),
        base_url: config.base_url.clone(),
    })
}

/// Everything one agent run needs: model, instruction, tools, sampling, and
/// how output is chunked. Cheap to clone and never mutated.
#[derive(Clone)]
pub struct BackendHandle {
    pub provider: Arc<dyn ModelProvider>,
    pub system_prompt: String,
    pub tools: ToolRegistry,
    pub settings: GenerationSettings,
    pub variant: StreamVariant,
}

impl BackendHandle {
    /// Handle over an arbitrary provider with the default instruction and no tools.
    pub fn new(provider: Arc<dyn ModelProvider>, variant: StreamVariant) -> Self {
        Self {
            provider,
            system_prompt: SYSTEM_PROMPT.to_string(),
            tools: ToolRegistry::empty(),
            settings: GenerationSettings::deterministic(),
            variant,
        }
    }

    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }
}

impl std::fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendHandle")
            .field("provider", &self.provider.provider_name())
            .field("model", &self.provider.model_id())
            .field("tools", &self.tools)
            .field("variant", &self.variant)
            .finish()
    }
}

/// Pure construction of backend handles. No network I/O happens here.
#[derive(Debug, Clone)]
pub struct BackendSelector {
    config: GatewayConfig,
    tools: ToolRegistry,
}

impl BackendSelector {
    pub fn new(config: GatewayConfig, tools: ToolRegistry) -> Self {
        Self { config, tools }
    }

    pub fn select(&self, identifier: &str) -> Result<BackendHandle> {
        let kind = BackendKind::parse(identifier).ok_or_else(|| {
            VoiceGitError::Configuration(format!(
                "unknown backend '{identifier}' (expected one of: {})",
                BackendKind::ALL.map(|k| k.to_string()).join(", ")
            ))
        })?;
        let backend = Backend::resolve(kind, &self.config)?;
        tracing::debug!(backend = %kind, "selected backend");
        Ok(backend.into_handle(self.tools.clone()))
    }
}

/// Produces the backend for each turn.
pub trait BackendResolver: Send + Sync {
    fn resolve(&self) -> Result<BackendHandle>;
}

/// Resolves a fixed identifier through a [`BackendSelector`] on every turn,
/// so a credential problem fails that turn instead of the session.
#[derive(Debug, Clone)]
pub struct ConfiguredBackend {
    selector: BackendSelector,
    identifier: String,
}

impl ConfiguredBackend {
    pub fn new(selector: BackendSelector, identifier: impl Into<String>) -> Self {
        Self {
            selector,
            identifier: identifier.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

impl BackendResolver for ConfiguredBackend {
    fn resolve(&self) -> Result<BackendHandle> {
        self.selector.select(&self.identifier)
    }
}

impl BackendResolver for BackendHandle {
    fn resolve(&self) -> Result<BackendHandle> {
        Ok(self.clone())
    }
}

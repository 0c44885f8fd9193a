//! Error types for voicegit.

pub mod unified;

pub use unified::ErrorCategory;

use thiserror::Error;

/// Primary error type for all voicegit operations.
#[derive(Error, Debug)]
pub enum VoiceGitError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limited: retry after {retry_after_ms:?}ms")]
    RateLimited { retry_after_ms: Option<u64> },

    #[error("Timeout after {0}ms")]
    Timeout(u64),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("MCP error: {0}")]
    Mcp(String),

    #[error("Tool {tool_name} failed: {message}")]
    ToolInvocation { tool_name: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Agent stopped after {0} model steps without a final answer")]
    IterationLimit(usize),

    #[error("Cancelled by user")]
    Cancelled,
}

impl VoiceGitError {
    /// Create an API error.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
        }
    }

    /// Create a tool invocation error.
    pub fn tool(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ToolInvocation {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Classify this error into a category.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration(_) => ErrorCategory::Configuration,
            Self::ToolInvocation { .. } | Self::InvalidArgument(_) => ErrorCategory::ToolInvocation,
            Self::Cancelled => ErrorCategory::Cancellation,
            Self::Network(_)
            | Self::Api { .. }
            | Self::Authentication(_)
            | Self::RateLimited { .. }
            | Self::Timeout(_)
            | Self::Stream(_)
            | Self::Mcp(_) => ErrorCategory::Transport,
            Self::Io(_) | Self::Serialization(_) | Self::IterationLimit(_) => ErrorCategory::Internal,
        }
    }

    /// Whether this error is potentially retryable at the transport level.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Timeout(_) => true,
            Self::Network(e) => e.is_connect() || e.is_timeout(),
            Self::Api { status, .. } => matches!(status, 500..=599),
            _ => false,
        }
    }
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, VoiceGitError>;

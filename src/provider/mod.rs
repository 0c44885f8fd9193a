//! Model provider trait and the two streaming backends.

pub mod anthropic;
pub mod azure;
pub mod http;
pub mod openai;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::{GenerationSettings, ModelMessage, TextStreamDelta};

pub use anthropic::AnthropicProvider;
pub use azure::AzureOpenAiProvider;
pub use openai::OpenAiProvider;

/// A request sent to a model provider.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub messages: Vec<ModelMessage>,
    pub settings: GenerationSettings,
    pub tools: Option<Vec<ToolDefinition>>,
}

/// Tool definition sent to the provider API.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A streaming chat model.
///
/// Providers emit text deltas as they arrive, one fully assembled
/// [`StreamEventType::ToolCallDelta`](crate::types::StreamEventType) per tool
/// call, and a final `Done` delta carrying the finish reason.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Provider name (e.g., "azure-openai", "anthropic").
    fn provider_name(&self) -> &str;
    /// The model or deployment this provider instance serves.
    fn model_id(&self) -> &str;

    /// Start one model step.
    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>>;
}

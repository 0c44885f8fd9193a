//! Azure OpenAI provider.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Result;
use crate::types::TextStreamDelta;
use crate::util::retry::RetryPolicy;

use super::http::azure_headers;
use super::openai::OpenAiProvider;
use super::{ModelProvider, ProviderRequest};

/// Azure OpenAI Service deployment speaking Chat Completions.
pub struct AzureOpenAiProvider {
    inner: OpenAiProvider,
}

impl AzureOpenAiProvider {
    /// `endpoint`: e.g. "https://myresource.openai.azure.com"
    /// `deployment`: e.g. "gpt-4.1-mini"
    /// `api_version`: e.g. "2024-12-01-preview"
    pub fn new(endpoint: &str, deployment: &str, api_key: &str, api_version: &str) -> Self {
        let url = completions_url(endpoint, deployment, api_version);
        Self {
            inner: OpenAiProvider::with_endpoint(
                "azure-openai",
                deployment,
                url,
                azure_headers(api_key),
            ),
        }
    }

    /// Retry establishing the stream on transient transport errors.
    pub fn with_max_retries(self, max_retries: u32) -> Self {
        Self {
            inner: self
                .inner
                .with_retry(RetryPolicy::with_max_retries(max_retries)),
        }
    }
}

fn completions_url(endpoint: &str, deployment: &str, api_version: &str) -> String {
    format!(
        "{}/openai/deployments/{}/chat/completions?api-version={}",
        endpoint.trim_end_matches('/'),
        deployment,
        api_version
    )
}

#[async_trait]
impl ModelProvider for AzureOpenAiProvider {
    fn provider_name(&self) -> &str {
        self.inner.provider_name()
    }

    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>> {
        self.inner.stream_text(request).await
    }
}

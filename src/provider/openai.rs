//! OpenAI Chat Completions streaming provider.

use std::collections::BTreeMap;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Result, VoiceGitError};
use crate::types::*;
use crate::util::retry::RetryPolicy;

use super::http::{bearer_headers, parse_sse_data, post_json, sse_lines};
use super::{ModelProvider, ProviderRequest};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Chat Completions client. Also drives Azure deployments, which speak the
/// same wire format behind a different URL and auth header.
pub struct OpenAiProvider {
    provider_name: &'static str,
    model: String,
    url: String,
    headers: HeaderMap,
    retry: Option<RetryPolicy>,
}

impl OpenAiProvider {
    pub fn new(model: impl Into<String>, api_key: &str, base_url: Option<String>) -> Self {
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Self::with_endpoint(
            "openai",
            model,
            format!("{}/chat/completions", base_url.trim_end_matches('/')),
            bearer_headers(api_key),
        )
    }

    /// Target a fully qualified completions URL.
    pub(crate) fn with_endpoint(
        provider_name: &'static str,
        model: impl Into<String>,
        url: String,
        headers: HeaderMap,
    ) -> Self {
        Self {
            provider_name,
            model: model.into(),
            url,
            headers,
            retry: None,
        }
    }

    /// Retry establishing the stream on transient transport errors.
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    pub(crate) fn build_request_body(&self, request: &ProviderRequest) -> Value {
        let messages = request
            .messages
            .iter()
            .flat_map(message_to_openai)
            .collect::<Vec<_>>();

        let mut body = serde_json::Map::new();
        body.insert("model".into(), self.model.clone().into());
        body.insert("messages".into(), messages.into());
        body.insert("stream".into(), true.into());
        body.insert("stream_options".into(), json!({ "include_usage": true }));

        if let Some(max) = request.settings.max_tokens {
            body.insert("max_tokens".into(), max.into());
        }
        if let Some(temp) = request.settings.temperature {
            body.insert("temperature".into(), temp.into());
        }
        if let Some(top_p) = request.settings.top_p {
            body.insert("top_p".into(), top_p.into());
        }

        if let Some(tools) = request.tools.as_ref().filter(|t| !t.is_empty()) {
            let tool_defs: Vec<Value> = tools
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect();
            body.insert("tools".into(), tool_defs.into());
        }

        Value::Object(body)
    }
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        self.provider_name
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>> {
        let body = self.build_request_body(request);
        debug!(
            provider = self.provider_name,
            model = %self.model,
            messages = request.messages.len(),
            "chat completions stream_text"
        );

        let send = || post_json(&self.url, self.headers.clone(), &body);
        let resp = match &self.retry {
            Some(policy) => policy.execute(send).await?,
            None => send().await?,
        };

        Ok(decode_chat_stream(sse_lines(resp)))
    }
}

#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

impl PartialToolCall {
    fn finish(self) -> AgentToolCall {
        let arguments = if self.arguments.trim().is_empty() {
            json!({})
        } else {
            serde_json::from_str(&self.arguments).unwrap_or(Value::String(self.arguments))
        };
        AgentToolCall {
            id: self.id,
            name: self.name,
            arguments,
        }
    }
}

/// Turn Chat Completions SSE lines into deltas. Tool-call fragments are
/// accumulated by index and released, in index order, once the stream ends.
pub(crate) fn decode_chat_stream(
    lines: BoxStream<'static, Result<String>>,
) -> BoxStream<'static, Result<TextStreamDelta>> {
    let stream = async_stream::stream! {
        let mut pending: BTreeMap<u32, PartialToolCall> = BTreeMap::new();
        let mut finish: Option<FinishReason> = None;
        let mut usage: Option<Usage> = None;
        let mut lines = lines;

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            if line.ends_with("[DONE]") {
                break;
            }
            let Some(data) = parse_sse_data(&line) else {
                continue;
            };
            let chunk = match serde_json::from_str::<ChatStreamChunk>(data) {
                Ok(chunk) => chunk,
                Err(e) => {
                    debug!(error = %e, "skipping unparseable chat chunk");
                    continue;
                }
            };
            if let Some(err) = chunk.error {
                yield Err(VoiceGitError::Stream(err.message));
                return;
            }
            if let Some(u) = chunk.usage {
                usage = Some(Usage {
                    input_tokens: u.prompt_tokens,
                    output_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                });
            }
            for choice in chunk.choices {
                if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                    yield Ok(TextStreamDelta::text(text));
                }
                for fragment in choice.delta.tool_calls.unwrap_or_default() {
                    let entry = pending.entry(fragment.index).or_default();
                    if let Some(id) = fragment.id {
                        entry.id = id;
                    }
                    if let Some(function) = fragment.function {
                        if let Some(name) = function.name {
                            entry.name.push_str(&name);
                        }
                        if let Some(arguments) = function.arguments {
                            entry.arguments.push_str(&arguments);
                        }
                    }
                }
                if let Some(reason) = choice.finish_reason.as_deref() {
                    finish = FinishReason::from_openai(reason).or(finish);
                }
            }
        }

        for (_, partial) in std::mem::take(&mut pending) {
            yield Ok(TextStreamDelta::tool_call(partial.finish()));
        }
        yield Ok(TextStreamDelta::done(finish, usage));
    };
    Box::pin(stream)
}

fn message_to_openai(msg: &ModelMessage) -> Vec<Value> {
    match msg.role {
        Role::System => vec![json!({ "role": "system", "content": msg.text_content() })],
        Role::User => vec![json!({ "role": "user", "content": msg.text_content() })],
        Role::Assistant => {
            let text = msg.text_content();
            let tool_calls = msg.tool_calls();
            if tool_calls.is_empty() {
                return vec![json!({ "role": "assistant", "content": text })];
            }
            let tc_json: Vec<Value> = tool_calls
                .iter()
                .map(|tc| {
                    json!({
                        "id": tc.id,
                        "type": "function",
                        "function": {
                            "name": tc.name,
                            "arguments": tc.arguments.to_string(),
                        }
                    })
                })
                .collect();
            vec![json!({
                "role": "assistant",
                "content": if text.is_empty() { Value::Null } else { Value::String(text) },
                "tool_calls": tc_json,
            })]
        }
        Role::Tool => msg
            .content
            .iter()
            .filter_map(|part| match part {
                ContentPart::ToolResult(tr) => Some(json!({
                    "role": "tool",
                    "tool_call_id": tr.tool_call_id,
                    "content": tr.content_text(),
                })),
                _ => None,
            })
            .collect(),
    }
}

// Wire types (internal)

#[derive(Deserialize)]
struct ChatStreamChunk {
    #[serde(default)]
    choices: Vec<ChatStreamChoice>,
    usage: Option<ChatUsage>,
    error: Option<ChatError>,
}

#[derive(Deserialize)]
struct ChatStreamChoice {
    #[serde(default)]
    delta: ChatStreamDelta,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Default)]
struct ChatStreamDelta {
    content: Option<String>,
    tool_calls: Option<Vec<ChatToolCallFragment>>,
}

#[derive(Deserialize)]
struct ChatToolCallFragment {
    #[serde(default)]
    index: u32,
    id: Option<String>,
    function: Option<ChatFunctionFragment>,
}

#[derive(Deserialize)]
struct ChatFunctionFragment {
    name: Option<String>,
    arguments: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Deserialize)]
struct ChatError {
    message: String,
}

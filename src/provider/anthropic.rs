//! Anthropic Messages API streaming provider.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{Result, VoiceGitError};
use crate::types::*;

use super::http::{anthropic_headers, parse_sse_data, post_json, sse_lines};
use super::{ModelProvider, ProviderRequest};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// The Messages API requires `max_tokens`; used when settings leave it open.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

pub struct AnthropicProvider {
    model: String,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(model: impl Into<String>, api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            model: model.into(),
            api_key: api_key.into(),
            base_url: base_url
                .map(|u| u.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    pub(crate) fn build_request_body(&self, request: &ProviderRequest) -> Value {
        let mut system_parts = Vec::new();
        let mut messages: Vec<Value> = Vec::new();

        for msg in &request.messages {
            match msg.role {
                Role::System => system_parts.push(msg.text_content()),
                Role::User => messages.push(json!({
                    "role": "user",
                    "content": msg.text_content(),
                })),
                Role::Assistant => {
                    let mut content: Vec<Value> = Vec::new();
                    for part in &msg.content {
                        match part {
                            ContentPart::Text { text } if !text.is_empty() => {
                                content.push(json!({ "type": "text", "text": text }));
                            }
                            ContentPart::ToolCall(tc) => content.push(json!({
                                "type": "tool_use",
                                "id": tc.id,
                                "name": tc.name,
                                "input": tc.arguments,
                            })),
                            _ => {}
                        }
                    }
                    if !content.is_empty() {
                        messages.push(json!({ "role": "assistant", "content": content }));
                    }
                }
                Role::Tool => {
                    let results: Vec<Value> = msg
                        .content
                        .iter()
                        .filter_map(|part| match part {
                            ContentPart::ToolResult(tr) => Some(json!({
                                "type": "tool_result",
                                "tool_use_id": tr.tool_call_id,
                                "content": tr.content_text(),
                                "is_error": tr.is_error,
                            })),
                            _ => None,
                        })
                        .collect();
                    // All results answering one assistant step share a user message.
                    if messages.last().is_some_and(is_tool_result_message) {
                        if let Some(blocks) = messages
                            .last_mut()
                            .and_then(|last| last["content"].as_array_mut())
                        {
                            blocks.extend(results);
                        }
                    } else {
                        messages.push(json!({ "role": "user", "content": results }));
                    }
                }
            }
        }

        let mut body = serde_json::Map::new();
        body.insert("model".into(), self.model.clone().into());
        body.insert("messages".into(), messages.into());
        body.insert(
            "max_tokens".into(),
            request.settings.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS).into(),
        );
        body.insert("stream".into(), true.into());

        if !system_parts.is_empty() {
            body.insert("system".into(), system_parts.join("\n").into());
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
                        "name": t.name,
                        "description": t.description,
                        "input_schema": t.parameters,
                    })
                })
                .collect();
            body.insert("tools".into(), tool_defs.into());
        }

        Value::Object(body)
    }
}

fn is_tool_result_message(message: &Value) -> bool {
    message["role"] == "user"
        && message["content"]
            .as_array()
            .and_then(|blocks| blocks.first())
            .is_some_and(|block| block["type"] == "tool_result")
}

#[async_trait]
impl ModelProvider for AnthropicProvider {
    fn provider_name(&self) -> &str {
        "anthropic"
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>> {
        let body = self.build_request_body(request);
        let url = format!("{}/messages", self.base_url);

        debug!(model = %self.model, messages = request.messages.len(), "Anthropic stream_text");

        let resp = post_json(&url, anthropic_headers(&self.api_key, API_VERSION), &body).await?;
        Ok(decode_messages_stream(sse_lines(resp)))
    }
}

#[derive(Default)]
struct ToolUseBlock {
    id: String,
    name: String,
    input: String,
}

/// Turn Messages API SSE lines into deltas. Only `text_delta` segments carry
/// text; `tool_use` blocks are assembled and released at `content_block_stop`.
pub(crate) fn decode_messages_stream(
    lines: BoxStream<'static, Result<String>>,
) -> BoxStream<'static, Result<TextStreamDelta>> {
    let stream = async_stream::stream! {
        let mut tool_block: Option<ToolUseBlock> = None;
        let mut finish: Option<FinishReason> = None;
        let mut usage = Usage::default();
        let mut lines = lines;

        while let Some(line) = lines.next().await {
            let line = match line {
                Ok(l) => l,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            let Some(data) = parse_sse_data(&line) else {
                continue;
            };
            let event: Value = match serde_json::from_str(data) {
                Ok(v) => v,
                Err(e) => {
                    debug!(error = %e, "skipping unparseable Anthropic event");
                    continue;
                }
            };

            match event["type"].as_str().unwrap_or("") {
                "message_start" => {
                    if let Some(tokens) = event["message"]["usage"]["input_tokens"].as_u64() {
                        usage.input_tokens = tokens as u32;
                    }
                }
                "content_block_start" => {
                    let block = &event["content_block"];
                    if block["type"] == "tool_use" {
                        tool_block = Some(ToolUseBlock {
                            id: block["id"].as_str().unwrap_or_default().to_string(),
                            name: block["name"].as_str().unwrap_or_default().to_string(),
                            input: String::new(),
                        });
                    }
                }
                "content_block_delta" => {
                    let delta = &event["delta"];
                    match delta["type"].as_str().unwrap_or("") {
                        "text_delta" => {
                            if let Some(text) = delta["text"].as_str().filter(|t| !t.is_empty()) {
                                yield Ok(TextStreamDelta::text(text));
                            }
                        }
                        "input_json_delta" => {
                            if let (Some(block), Some(json)) =
                                (tool_block.as_mut(), delta["partial_json"].as_str())
                            {
                                block.input.push_str(json);
                            }
                        }
                        _ => {}
                    }
                }
                "content_block_stop" => {
                    if let Some(block) = tool_block.take() {
                        let arguments = if block.input.trim().is_empty() {
                            json!({})
                        } else {
                            serde_json::from_str(&block.input).unwrap_or(Value::String(block.input))
                        };
                        yield Ok(TextStreamDelta::tool_call(AgentToolCall {
                            id: block.id,
                            name: block.name,
                            arguments,
                        }));
                    }
                }
                "message_delta" => {
                    if let Some(reason) = event["delta"]["stop_reason"].as_str() {
                        finish = FinishReason::from_anthropic(reason);
                    }
                    if let Some(tokens) = event["usage"]["output_tokens"].as_u64() {
                        usage.output_tokens = tokens as u32;
                    }
                }
                "message_stop" => break,
                "error" => {
                    let message = event["error"]["message"]
                        .as_str()
                        .unwrap_or("unknown stream error")
                        .to_string();
                    yield Err(VoiceGitError::Stream(message));
                    return;
                }
                _ => {}
            }
        }

        usage.total_tokens = usage.input_tokens + usage.output_tokens;
        yield Ok(TextStreamDelta::done(finish, Some(usage)));
    };
    Box::pin(stream)
}

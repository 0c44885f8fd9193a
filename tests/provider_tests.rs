//! Provider wire behaviour against a local mock server.

use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use voicegit::error::{Result, VoiceGitError};
use voicegit::provider::{AnthropicProvider, AzureOpenAiProvider, ModelProvider, ProviderRequest, ToolDefinition};
use voicegit::types::{FinishReason, GenerationSettings, ModelMessage, StreamEventType, TextStreamDelta};

fn sse(events: &[serde_json::Value]) -> String {
    let mut body = String::new();
    for event in events {
        body.push_str(&format!("data: {event}\n\n"));
    }
    body
}

fn request() -> ProviderRequest {
    ProviderRequest {
        messages: vec![ModelMessage::system("be brief"), ModelMessage::user("who am I?")],
        settings: GenerationSettings::deterministic(),
        tools: Some(vec![ToolDefinition {
            name: "get_me".into(),
            description: "Get the authenticated user".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }]),
    }
}

async fn drain(provider: &dyn ModelProvider) -> Result<Vec<TextStreamDelta>> {
    let mut stream = provider.stream_text(&request()).await?;
    let mut deltas = Vec::new();
    while let Some(delta) = stream.next().await {
        deltas.push(delta?);
    }
    Ok(deltas)
}

#[tokio::test]
async fn azure_streams_text_and_assembles_tool_calls() {
    let server = MockServer::start().await;
    let mut body = sse(&[
        json!({"choices": [{"index": 0, "delta": {"role": "assistant", "content": "Checking"}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "id": "call_1", "type": "function", "function": {"name": "get_me", "arguments": "{\"verbose\""}}
        ]}}]}),
        json!({"choices": [{"index": 0, "delta": {"tool_calls": [
            {"index": 0, "function": {"arguments": ":true}"}}
        ]}}]}),
        json!({"choices": [{"index": 0, "delta": {}, "finish_reason": "tool_calls"}]}),
        json!({"choices": [], "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}}),
    ]);
    body.push_str("data: [DONE]\n\n");

    Mock::given(method("POST"))
        .and(path("/openai/deployments/gpt-4.1-mini/chat/completions"))
        .and(query_param("api-version", "2024-12-01-preview"))
        .and(header("api-key", "az-key"))
        .and(body_string_contains("\"stream\":true"))
        .and(body_string_contains("\"get_me\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = AzureOpenAiProvider::new(&server.uri(), "gpt-4.1-mini", "az-key", "2024-12-01-preview");
    let deltas = drain(&provider).await.expect("stream");

    assert_eq!(deltas.len(), 3);
    assert_eq!(deltas[0].text, "Checking");
    assert_eq!(deltas[1].event_type, StreamEventType::ToolCallDelta);
    let call = deltas[1].tool_call.as_ref().expect("tool call");
    assert_eq!(call.id, "call_1");
    assert_eq!(call.name, "get_me");
    assert_eq!(call.arguments, json!({"verbose": true}));
    assert_eq!(deltas[2].event_type, StreamEventType::Done);
    assert_eq!(deltas[2].finish_reason, Some(FinishReason::ToolCalls));
    assert_eq!(deltas[2].usage.as_ref().map(|u| u.total_tokens), Some(19));
}

#[tokio::test]
async fn azure_rejected_key_is_an_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Access denied due to invalid subscription key"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = AzureOpenAiProvider::new(&server.uri(), "gpt-4.1-mini", "wrong", "2024-12-01-preview")
        .with_max_retries(6);
    let err = drain(&provider).await.expect_err("401");

    assert!(matches!(err, VoiceGitError::Authentication(m) if m.contains("invalid subscription key")));
}

#[tokio::test]
async fn anthropic_streams_text_segments_and_tool_use() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({"type": "message_start", "message": {"usage": {"input_tokens": 20, "output_tokens": 1}}}),
        json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "Let me "}}),
        json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": "check."}}),
        json!({"type": "content_block_stop", "index": 0}),
        json!({"type": "content_block_start", "index": 1, "content_block": {"type": "tool_use", "id": "toolu_1", "name": "get_me", "input": {}}}),
        json!({"type": "content_block_delta", "index": 1, "delta": {"type": "input_json_delta", "partial_json": ""}}),
        json!({"type": "content_block_stop", "index": 1}),
        json!({"type": "message_delta", "delta": {"stop_reason": "tool_use"}, "usage": {"output_tokens": 30}}),
        json!({"type": "message_stop"}),
    ]);

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "ant-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_string_contains("\"system\":\"be brief\""))
        .and(body_string_contains("\"input_schema\""))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let provider = AnthropicProvider::new(
        "claude-3-5-sonnet-20241022",
        "ant-key",
        Some(format!("{}/v1", server.uri())),
    );
    let deltas = drain(&provider).await.expect("stream");

    let texts: Vec<&str> = deltas
        .iter()
        .filter(|d| d.event_type == StreamEventType::TextDelta)
        .map(|d| d.text.as_str())
        .collect();
    assert_eq!(texts, vec!["Let me ", "check."]);
    let call = deltas
        .iter()
        .find_map(|d| d.tool_call.as_ref())
        .expect("tool call");
    assert_eq!(call.name, "get_me");
    assert_eq!(call.arguments, json!({}));
    let done = deltas.last().expect("done");
    assert_eq!(done.event_type, StreamEventType::Done);
    assert_eq!(done.finish_reason, Some(FinishReason::ToolCalls));
    assert_eq!(done.usage.as_ref().map(|u| u.total_tokens), Some(50));
}

#[tokio::test]
async fn anthropic_error_event_fails_the_stream() {
    let server = MockServer::start().await;
    let body = sse(&[
        json!({"type": "message_start", "message": {"usage": {"input_tokens": 5}}}),
        json!({"type": "error", "error": {"type": "overloaded_error", "message": "Overloaded"}}),
    ]);
    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let provider = AnthropicProvider::new("claude-3-5-sonnet-20241022", "ant-key", Some(format!("{}/v1", server.uri())));
    let err = drain(&provider).await.expect_err("error event");

    assert!(matches!(err, VoiceGitError::Stream(m) if m == "Overloaded"));
}

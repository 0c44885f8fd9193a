//! One streamed model step.

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::{self, Sleep};

use super::Driver;
use crate::agent_loop::chunk::OutputChunk;
use crate::agent_loop::state::{AgentLoopState, StateTracker};
use crate::error::{Result, VoiceGitError};
use crate::provider::ProviderRequest;
use crate::types::{AgentToolCall, FinishReason, StreamEventType, Usage};

const DEFAULT_IDLE_TIMEOUT_MS: u64 = 120_000;

/// What the model produced in one step.
#[derive(Debug, Default)]
pub(super) struct ModelStep {
    pub text: String,
    pub tool_calls: Vec<AgentToolCall>,
    pub usage: Option<Usage>,
    pub finish_reason: Option<FinishReason>,
}

async fn idle(sleep: &mut Option<Pin<Box<Sleep>>>) {
    match sleep {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

/// A repeated id replaces the earlier call; calls without an id are distinct.
fn merge_tool_call(calls: &mut Vec<AgentToolCall>, call: AgentToolCall) {
    let existing = (!call.id.is_empty())
        .then(|| calls.iter_mut().find(|c| c.id == call.id))
        .flatten();
    match existing {
        Some(existing) => *existing = call,
        None => calls.push(call),
    }
}

pub(super) async fn stream_step(
    driver: &Driver,
    request: &ProviderRequest,
    state: &mut StateTracker,
) -> Result<ModelStep> {
    let provider = &driver.backend.provider;
    let mut stream = tokio::select! {
        biased;
        _ = driver.cancel.cancelled() => return Err(VoiceGitError::Cancelled),
        opened = provider.stream_text(request) => opened?,
    };

    let idle_timeout_ms = request
        .settings
        .stream_idle_timeout_ms
        .unwrap_or(DEFAULT_IDLE_TIMEOUT_MS);
    let mut idle_sleep =
        (idle_timeout_ms > 0).then(|| Box::pin(time::sleep(Duration::from_millis(idle_timeout_ms))));
    let segments = driver.backend.variant.streams_segments();
    let mut step = ModelStep::default();

    loop {
        tokio::select! {
            biased;
            _ = driver.cancel.cancelled() => return Err(VoiceGitError::Cancelled),
            _ = idle(&mut idle_sleep) => {
                return Err(VoiceGitError::Stream("stream idle timeout".into()));
            }
            delta = stream.next() => {
                let Some(delta) = delta else { break; };
                let delta = delta?;
                if let Some(sleep) = idle_sleep.as_mut() {
                    sleep
                        .as_mut()
                        .reset(time::Instant::now() + Duration::from_millis(idle_timeout_ms));
                }
                match delta.event_type {
                    StreamEventType::TextDelta => {
                        if delta.text.is_empty() {
                            continue;
                        }
                        state.advance(AgentLoopState::ModelEmittingText);
                        step.text.push_str(&delta.text);
                        if segments {
                            driver.emit(Ok(OutputChunk::text(delta.text))).await?;
                        }
                    }
                    StreamEventType::ToolCallDelta => {
                        if let Some(call) = delta.tool_call {
                            merge_tool_call(&mut step.tool_calls, call);
                        }
                    }
                    StreamEventType::Error => {
                        let message = if delta.text.is_empty() {
                            "stream error".to_string()
                        } else {
                            delta.text
                        };
                        return Err(VoiceGitError::Stream(message));
                    }
                    StreamEventType::Done => {
                        step.usage = delta.usage;
                        step.finish_reason = delta.finish_reason;
                        break;
                    }
                }
            }
        }
    }

    Ok(step)
}

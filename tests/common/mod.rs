//! Shared test helpers: scripted provider, tools, input, and surface.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

use voicegit::agent_loop::{OutputChunk, StreamVariant};
use voicegit::backend::BackendHandle;
use voicegit::error::{Result, VoiceGitError};
use voicegit::provider::{ModelProvider, ProviderRequest};
use voicegit::session::{ChatSurface, ChunkSink, LineSource};
use voicegit::tools::{AgentTool, AgentToolParameters, Tool, ToolRegistry};
use voicegit::types::{AgentToolCall, FinishReason, TextStreamDelta, Usage};

/// One scripted model step.
pub enum Step {
    /// Deltas delivered in order, then the stream ends.
    Deltas(Vec<Result<TextStreamDelta>>),
    /// Opening the stream fails.
    OpenError(VoiceGitError),
    /// Deltas delivered, then the stream never yields again.
    Hang(Vec<TextStreamDelta>),
}

/// A step answering with text split across deltas.
pub fn text_step(parts: &[&str]) -> Step {
    let mut deltas: Vec<Result<TextStreamDelta>> =
        parts.iter().map(|p| Ok(TextStreamDelta::text(*p))).collect();
    deltas.push(Ok(TextStreamDelta::done(
        Some(FinishReason::Stop),
        Some(Usage {
            input_tokens: 10,
            output_tokens: 5,
            total_tokens: 15,
        }),
    )));
    Step::Deltas(deltas)
}

/// A step requesting one tool call.
pub fn tool_step(id: &str, name: &str, arguments: Value) -> Step {
    Step::Deltas(tool_deltas(id, name, arguments).into_iter().map(Ok).collect())
}

fn tool_deltas(id: &str, name: &str, arguments: Value) -> Vec<TextStreamDelta> {
    vec![
        TextStreamDelta::tool_call(AgentToolCall {
            id: id.to_string(),
            name: name.to_string(),
            arguments,
        }),
        TextStreamDelta::done(Some(FinishReason::ToolCalls), None),
    ]
}

/// Provider that replays scripted steps and records every request.
pub struct ScriptedProvider {
    steps: Mutex<VecDeque<Step>>,
    /// Replayed (as tool calls) once the script runs out.
    repeat_tool: Option<(String, Value)>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(steps.into()),
            repeat_tool: None,
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Calls `name` on every step, forever.
    pub fn always_calling(name: &str) -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::new()),
            repeat_tool: Some((name.to_string(), json!({}))),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_id(&self) -> &str {
        "scripted-model"
    }

    async fn stream_text(
        &self,
        request: &ProviderRequest,
    ) -> Result<BoxStream<'static, Result<TextStreamDelta>>> {
        let call_index = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };
        let step = self.steps.lock().unwrap().pop_front();
        match step {
            Some(Step::Deltas(deltas)) => Ok(stream::iter(deltas).boxed()),
            Some(Step::OpenError(err)) => Err(err),
            Some(Step::Hang(deltas)) => Ok(stream::iter(deltas.into_iter().map(Ok::<_, VoiceGitError>))
                .chain(stream::pending())
                .boxed()),
            None => match &self.repeat_tool {
                Some((name, args)) => Ok(stream::iter(
                    tool_deltas(&format!("call_{call_index}"), name, args.clone())
                        .into_iter()
                        .map(Ok::<_, VoiceGitError>),
                )
                .boxed()),
                None => Err(VoiceGitError::Stream("script exhausted".into())),
            },
        }
    }
}

pub fn handle(provider: Arc<ScriptedProvider>, variant: StreamVariant, tools: ToolRegistry) -> BackendHandle {
    BackendHandle::new(provider, variant).with_tools(tools)
}

/// `get_me` that always fails the way an unauthenticated GitHub call does.
pub fn failing_identity_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "get_me",
        "Get details of the authenticated GitHub user",
        AgentToolParameters::empty(),
        |_args, _ctx| async move {
            Err(VoiceGitError::tool("get_me", "401 Bad credentials"))
        },
    ))
}

/// `get_me` that answers with a fixed login.
pub fn identity_tool(login: &'static str) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "get_me",
        "Get details of the authenticated GitHub user",
        AgentToolParameters::empty(),
        move |_args, _ctx| async move { Ok(json!({ "login": login })) },
    ))
}

/// Tool that takes `delay` to answer and raises `finished` when it does.
pub fn slow_tool(name: &'static str, delay: Duration, finished: Arc<AtomicBool>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        name,
        "Answers slowly",
        AgentToolParameters::empty(),
        move |_args, _ctx| {
            let finished = finished.clone();
            async move {
                tokio::time::sleep(delay).await;
                finished.store(true, Ordering::SeqCst);
                Ok(json!("done"))
            }
        },
    ))
}

/// Input that replays lines, then either reports end of input or waits forever.
pub struct ScriptedInput {
    lines: VecDeque<String>,
    wait_when_empty: bool,
    pub prompts: Vec<String>,
}

impl ScriptedInput {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            wait_when_empty: false,
            prompts: Vec::new(),
        }
    }

    pub fn then_wait(mut self) -> Self {
        self.wait_when_empty = true;
        self
    }
}

#[async_trait]
impl LineSource for ScriptedInput {
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        self.prompts.push(prompt.to_string());
        match self.lines.pop_front() {
            Some(line) => Ok(Some(line)),
            None if self.wait_when_empty => std::future::pending().await,
            None => Ok(None),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceEvent {
    Banner,
    Begin,
    Chunk(OutputChunk),
    End,
    Error(String),
    Farewell,
    Interrupted,
}

/// Surface that records what the session showed.
#[derive(Default)]
pub struct RecordingSurface {
    pub events: Vec<SurfaceEvent>,
    /// Cancelled when the first chunk arrives.
    pub cancel_on_chunk: Option<CancellationToken>,
}

impl RecordingSurface {
    pub fn errors(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Error(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn chunks(&self) -> Vec<&OutputChunk> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SurfaceEvent::Chunk(chunk) => Some(chunk),
                _ => None,
            })
            .collect()
    }
}

impl ChunkSink for RecordingSurface {
    fn write_chunk(&mut self, chunk: &OutputChunk) -> Result<()> {
        self.events.push(SurfaceEvent::Chunk(chunk.clone()));
        if let Some(token) = &self.cancel_on_chunk {
            token.cancel();
        }
        Ok(())
    }
}

impl ChatSurface for RecordingSurface {
    fn show_banner(&mut self) -> Result<()> {
        self.events.push(SurfaceEvent::Banner);
        Ok(())
    }

    fn begin_response(&mut self) -> Result<()> {
        self.events.push(SurfaceEvent::Begin);
        Ok(())
    }

    fn end_response(&mut self) -> Result<()> {
        self.events.push(SurfaceEvent::End);
        Ok(())
    }

    fn show_error(&mut self, err: &VoiceGitError) -> Result<()> {
        self.events.push(SurfaceEvent::Error(
            voicegit::session::surface::error_notice(err),
        ));
        Ok(())
    }

    fn show_farewell(&mut self) -> Result<()> {
        self.events.push(SurfaceEvent::Farewell);
        Ok(())
    }

    fn show_interrupted(&mut self) -> Result<()> {
        self.events.push(SurfaceEvent::Interrupted);
        Ok(())
    }
}

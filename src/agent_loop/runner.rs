//! Spawned-task runner feeding a bounded chunk channel.

mod llm_phase;
mod tool_phase;

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::chunk::OutputChunk;
use super::state::{AgentLoopState, StateTracker};
use crate::backend::BackendHandle;
use crate::error::{Result, VoiceGitError};
use crate::provider::ProviderRequest;
use crate::session::Turn;
use crate::types::{FinishReason, ModelMessage, Usage};

pub const DEFAULT_MAX_ITERATIONS: usize = 25;
/// How long a tool already running at cancellation may take to finish.
pub const DEFAULT_TOOL_GRACE_PERIOD: Duration = Duration::from_secs(5);
const CHUNK_BUFFER: usize = 32;

/// Agent loop configuration. Each [`AgentLoop::run`] is independent.
#[derive(Debug, Clone)]
pub struct AgentLoop {
    pub max_iterations: usize,
    pub tool_grace_period: Duration,
}

impl Default for AgentLoop {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tool_grace_period: DEFAULT_TOOL_GRACE_PERIOD,
        }
    }
}

impl AgentLoop {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tool_grace_period(mut self, grace: Duration) -> Self {
        self.tool_grace_period = grace;
        self
    }

    /// Start answering the last user turn of `context`.
    ///
    /// The model sees the backend's system prompt followed by `context` in
    /// order. Chunks arrive on the returned stream; a model or transport
    /// failure arrives as the final `Err` item. Cancelling `cancel` (or
    /// dropping the run) stops the loop and no further chunks are produced.
    ///
    /// Must be called from within a tokio runtime.
    pub fn run(
        &self,
        context: &[Turn],
        backend: &BackendHandle,
        cancel: CancellationToken,
    ) -> AgentRun {
        let messages = build_messages(&backend.system_prompt, context);
        let cancel = cancel.child_token();
        let (tx, rx) = mpsc::channel(CHUNK_BUFFER);
        let run_id = Uuid::new_v4();

        let driver = Driver {
            run_id,
            config: self.clone(),
            backend: backend.clone(),
            cancel: cancel.clone(),
            tx,
        };
        let driver = tokio::spawn(driver.drive(messages));

        AgentRun {
            run_id,
            chunks: ReceiverStream::new(rx),
            cancel,
            driver: Some(driver),
            grace: self.tool_grace_period,
        }
    }
}

fn build_messages(system_prompt: &str, context: &[Turn]) -> Vec<ModelMessage> {
    let mut messages = Vec::with_capacity(context.len() + 1);
    if !system_prompt.is_empty() {
        messages.push(ModelMessage::system(system_prompt));
    }
    messages.extend(context.iter().map(ModelMessage::from));
    messages
}

/// Output of one run, pulled by the caller.
#[derive(Debug)]
pub struct AgentRun {
    run_id: Uuid,
    chunks: ReceiverStream<Result<OutputChunk>>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
    grace: Duration,
}

impl AgentRun {
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Stop the run. Chunks already buffered are discarded by the caller.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel the run and wait for its task to stop.
    ///
    /// A tool call in flight may still finish; the wait is bounded by the
    /// tool grace period, after which the task is left to be dropped.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        let Some(driver) = self.driver.take() else {
            return;
        };
        match time::timeout(self.grace, driver).await {
            Ok(Ok(())) => tracing::debug!(run_id = %self.run_id, "agent run stopped"),
            Ok(Err(err)) => {
                tracing::warn!(run_id = %self.run_id, error = %err, "agent run task failed")
            }
            Err(_) => tracing::warn!(
                run_id = %self.run_id,
                grace_ms = self.grace.as_millis() as u64,
                "agent run still busy after grace period"
            ),
        }
    }
}

impl Stream for AgentRun {
    type Item = Result<OutputChunk>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.cancel.is_cancelled() {
            return Poll::Ready(None);
        }
        Pin::new(&mut self.chunks).poll_next(cx)
    }
}

impl Drop for AgentRun {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

struct Driver {
    run_id: Uuid,
    config: AgentLoop,
    backend: BackendHandle,
    cancel: CancellationToken,
    tx: mpsc::Sender<Result<OutputChunk>>,
}

impl Driver {
    async fn drive(self, messages: Vec<ModelMessage>) {
        tracing::debug!(
            run_id = %self.run_id,
            provider = self.backend.provider.provider_name(),
            model = self.backend.provider.model_id(),
            messages = messages.len(),
            tools = self.backend.tools.len(),
            "agent run start"
        );
        match self.run_steps(messages).await {
            Ok(usage) => tracing::debug!(
                run_id = %self.run_id,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "agent run completed"
            ),
            Err(VoiceGitError::Cancelled) => {
                tracing::debug!(run_id = %self.run_id, "agent run cancelled")
            }
            Err(err) => {
                tracing::debug!(run_id = %self.run_id, error = %err, "agent run failed");
                let _ = self.emit(Err(err)).await;
            }
        }
    }

    async fn run_steps(&self, mut messages: Vec<ModelMessage>) -> Result<Usage> {
        let variant = self.backend.variant;
        let definitions = self.backend.tools.definitions();
        let tools = (!definitions.is_empty()).then_some(definitions);
        let mut state = StateTracker::new();
        let mut usage = Usage::default();

        for iteration in 1..=self.config.max_iterations {
            let request = ProviderRequest {
                messages: messages.clone(),
                settings: self.backend.settings.clone(),
                tools: tools.clone(),
            };
            let step = llm_phase::stream_step(self, &request, &mut state).await?;
            if let Some(step_usage) = &step.usage {
                usage.merge(step_usage);
            }
            tracing::debug!(
                run_id = %self.run_id,
                iteration,
                text_len = step.text.len(),
                tool_calls = step.tool_calls.len(),
                finish_reason = ?step.finish_reason,
                "model step complete"
            );
            if matches!(
                step.finish_reason,
                Some(FinishReason::Length | FinishReason::ContentFilter)
            ) {
                tracing::warn!(
                    run_id = %self.run_id,
                    finish_reason = ?step.finish_reason,
                    "model output was cut short"
                );
            }

            if !variant.streams_segments() && !step.text.is_empty() {
                self.emit(Ok(OutputChunk::text(step.text.clone()))).await?;
            }

            if step.tool_calls.is_empty() {
                state.advance(AgentLoopState::Done);
                return Ok(usage);
            }

            messages.push(ModelMessage::assistant_step(step.text, &step.tool_calls));
            for call in &step.tool_calls {
                state.advance(AgentLoopState::ToolCallPending);
                let result = match tool_phase::execute_call(
                    &self.backend.tools,
                    call,
                    &self.cancel,
                    self.config.tool_grace_period,
                )
                .await
                {
                    tool_phase::ToolOutcome::Completed(result) => result,
                    tool_phase::ToolOutcome::Abandoned => return Err(VoiceGitError::Cancelled),
                };
                state.advance(AgentLoopState::ToolResultReceived);
                let observation = result.content_text();
                if variant.reports_tool_events() && !observation.is_empty() {
                    self.emit(Ok(OutputChunk::tool_event(&observation))).await?;
                }
                messages.push(ModelMessage::tool_result(result));
            }
            state.advance(AgentLoopState::AwaitingModel);
        }

        tracing::warn!(
            max_iterations = self.config.max_iterations,
            "agent loop exceeded max iterations"
        );
        Err(VoiceGitError::IterationLimit(self.config.max_iterations))
    }

    /// Hand one item to the caller. Fails with `Cancelled` once the run is
    /// cancelled or the caller has gone away.
    async fn emit(&self, item: Result<OutputChunk>) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(VoiceGitError::Cancelled);
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(VoiceGitError::Cancelled),
            sent = self.tx.send(item) => sent.map_err(|_| VoiceGitError::Cancelled),
        }
    }
}

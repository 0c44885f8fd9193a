//! Tool execution. Failures become observations for the model.

use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::error::VoiceGitError;
use crate::tools::{ToolArguments, ToolExecutionContext, ToolRegistry};
use crate::types::{AgentToolCall, AgentToolResult};
use crate::util::timeout::with_timeout;

pub(super) enum ToolOutcome {
    Completed(AgentToolResult),
    /// The run was cancelled; the result (if any) is not used.
    Abandoned,
}

/// Run one call. A call in flight when `cancel` fires gets `grace` to finish
/// before it is dropped.
pub(super) async fn execute_call(
    tools: &ToolRegistry,
    call: &AgentToolCall,
    cancel: &CancellationToken,
    grace: Duration,
) -> ToolOutcome {
    if cancel.is_cancelled() {
        return ToolOutcome::Abandoned;
    }

    let invocation = invoke(tools, call);
    tokio::pin!(invocation);

    tokio::select! {
        result = &mut invocation => ToolOutcome::Completed(result),
        _ = cancel.cancelled() => {
            let finished = with_timeout(grace, async { Ok::<_, VoiceGitError>(invocation.await) }).await;
            match finished {
                Ok(_) => tracing::debug!(tool = %call.name, "tool finished after cancellation"),
                Err(_) => tracing::warn!(
                    tool = %call.name,
                    grace_ms = grace.as_millis() as u64,
                    "abandoning tool call after grace period"
                ),
            }
            ToolOutcome::Abandoned
        }
    }
}

async fn invoke(tools: &ToolRegistry, call: &AgentToolCall) -> AgentToolResult {
    let outcome = match tools.get(&call.name) {
        None => Err(VoiceGitError::tool(&call.name, "no such tool")),
        Some(tool) => match ToolArguments::from_model(&call.arguments) {
            Ok(args) => {
                let ctx = ToolExecutionContext {
                    tool_call_id: call.id.clone(),
                };
                tool.execute(&args, &ctx).await
            }
            Err(err) => Err(err),
        },
    };

    match outcome {
        Ok(result) => {
            tracing::debug!(tool = %call.name, "tool call succeeded");
            AgentToolResult {
                tool_call_id: call.id.clone(),
                result,
                is_error: false,
            }
        }
        Err(err) => {
            tracing::warn!(tool = %call.name, error = %err, "tool call failed");
            AgentToolResult {
                tool_call_id: call.id.clone(),
                result: Value::String(format!("Error: {err}")),
                is_error: true,
            }
        }
    }
}

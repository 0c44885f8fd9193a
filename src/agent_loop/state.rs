//! Run state machine.

use strum::Display;

/// Where a run is in its model/tool cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum AgentLoopState {
    AwaitingModel,
    ModelEmittingText,
    ToolCallPending,
    ToolResultReceived,
    Done,
}

impl AgentLoopState {
    pub fn can_transition_to(self, next: AgentLoopState) -> bool {
        use AgentLoopState::*;
        matches!(
            (self, next),
            (AwaitingModel, ModelEmittingText)
                | (AwaitingModel, ToolCallPending)
                | (AwaitingModel, Done)
                | (ModelEmittingText, ModelEmittingText)
                | (ModelEmittingText, ToolCallPending)
                | (ModelEmittingText, Done)
                | (ToolCallPending, ToolResultReceived)
                | (ToolResultReceived, ToolCallPending)
                | (ToolResultReceived, AwaitingModel)
        )
    }
}

/// Tracks the current state and logs every transition.
#[derive(Debug)]
pub(crate) struct StateTracker {
    current: AgentLoopState,
}

impl StateTracker {
    pub(crate) fn new() -> Self {
        Self {
            current: AgentLoopState::AwaitingModel,
        }
    }

    pub(crate) fn current(&self) -> AgentLoopState {
        self.current
    }

    pub(crate) fn advance(&mut self, next: AgentLoopState) {
        if self.current == next {
            return;
        }
        debug_assert!(
            self.current.can_transition_to(next),
            "illegal transition {} -> {}",
            self.current,
            next
        );
        tracing::trace!(from = %self.current, to = %next, "agent loop transition");
        self.current = next;
    }
}

//! Error classification used at the session boundary.

/// Broad error category for routing recovery logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Unknown backend or missing credentials. Fatal to a turn only.
    Configuration,
    /// A tool call failed. Fed back to the model as an observation.
    ToolInvocation,
    /// Model or tool-server transport failure. Propagates to the session.
    Transport,
    /// User-initiated interruption.
    Cancellation,
    Internal,
}

impl ErrorCategory {
    /// Whether a session may keep reading input after an error of this category.
    pub fn is_recoverable(self) -> bool {
        !matches!(self, Self::Cancellation)
    }
}

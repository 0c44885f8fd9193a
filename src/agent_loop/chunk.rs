//! Output chunks produced by a run.

use serde::{Deserialize, Serialize};

/// One incremental unit of a streamed answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OutputChunk {
    /// Model-authored text.
    Text { text: String },
    /// Notice that a tool ran, including its result.
    ToolEvent { text: String },
}

impl OutputChunk {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Wrap a tool result as a notice distinct from model text.
    pub fn tool_event(result: &str) -> Self {
        Self::ToolEvent {
            text: format!("\n🔧 Tool executed: {result}\n"),
        }
    }

    /// Contribution of this chunk to the assembled response.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text { text } | Self::ToolEvent { text } => text,
        }
    }

    pub fn is_tool_event(&self) -> bool {
        matches!(self, Self::ToolEvent { .. })
    }
}

/// How a backend's model output is turned into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamVariant {
    /// One `Text` chunk per completed model step; tool results are not shown.
    MessageBuffered,
    /// One `Text` chunk per text segment as it arrives, plus a `ToolEvent`
    /// chunk for every tool result.
    SegmentStreaming,
}

impl StreamVariant {
    pub fn streams_segments(self) -> bool {
        matches!(self, Self::SegmentStreaming)
    }

    pub fn reports_tool_events(self) -> bool {
        matches!(self, Self::SegmentStreaming)
    }
}

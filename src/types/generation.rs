//! Generation settings and related enums.

use bon::Builder;
use serde::{Deserialize, Serialize};
use strum::Display;

/// Settings controlling text generation.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, Default, PartialEq)]
pub struct GenerationSettings {
    /// `None` leaves output length to the provider.
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    /// Abort a model step when no delta arrives for this long. `Some(0)` disables.
    pub stream_idle_timeout_ms: Option<u64>,
}

impl GenerationSettings {
    /// Deterministic sampling with no explicit output cap.
    pub fn deterministic() -> Self {
        Self::builder().temperature(0.0).build()
    }
}

/// Why generation finished.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Error,
}

impl FinishReason {
    /// Map an OpenAI-style `finish_reason` string.
    pub fn from_openai(s: &str) -> Option<Self> {
        match s {
            "stop" => Some(Self::Stop),
            "length" => Some(Self::Length),
            "tool_calls" | "function_call" => Some(Self::ToolCalls),
            "content_filter" => Some(Self::ContentFilter),
            _ => None,
        }
    }

    /// Map an Anthropic `stop_reason` string.
    pub fn from_anthropic(s: &str) -> Option<Self> {
        match s {
            "end_turn" | "stop_sequence" => Some(Self::Stop),
            "max_tokens" => Some(Self::Length),
            "tool_use" => Some(Self::ToolCalls),
            "refusal" => Some(Self::ContentFilter),
            _ => None,
        }
    }
}

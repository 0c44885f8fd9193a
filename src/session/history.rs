//! Conversation turns.

use serde::{Deserialize, Serialize};

use crate::types::ModelMessage;

/// Who authored a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One user or assistant message in the session history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }

    pub fn to_message(&self) -> ModelMessage {
        match self.role {
            TurnRole::User => ModelMessage::user(self.content.as_str()),
            TurnRole::Assistant => ModelMessage::assistant(self.content.as_str()),
        }
    }
}

impl From<&Turn> for ModelMessage {
    fn from(turn: &Turn) -> Self {
        turn.to_message()
    }
}

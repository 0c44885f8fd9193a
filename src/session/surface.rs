//! Input and output seams of the chat session.

use async_trait::async_trait;

use super::multiplex::ChunkSink;
use crate::config::UserProfile;
use crate::error::{Result, VoiceGitError};

pub const BANNER: &str = "Git Agent Chat started!";
pub const EXIT_HINT: &str = "Type 'quit', 'q', or 'stop' to exit";
pub const FAREWELL: &str = "Goodbye! Thanks for using VoiceGit!";
pub const INTERRUPTED: &str = "⚠️ Chat interrupted by user";
pub const RESPONSE_HEADER: &str = "Assistant:";
pub const SEPARATOR_WIDTH: usize = 50;

/// Label shown before each input line.
pub fn prompt_label(profile: Option<&UserProfile>) -> String {
    match profile.map(|p| p.name.trim()).filter(|name| !name.is_empty()) {
        Some(name) => format!("{name}: "),
        None => "User: ".to_string(),
    }
}

pub fn separator() -> String {
    "*".repeat(SEPARATOR_WIDTH)
}

/// Error notice shown for a failed turn.
pub fn error_notice(err: &VoiceGitError) -> String {
    format!("❌ Error: {err}")
}

/// Source of user input lines.
#[async_trait]
pub trait LineSource: Send {
    /// Show `prompt` and read one line without its terminator.
    /// `None` means end of input.
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Where the session renders its output.
pub trait ChatSurface: ChunkSink {
    fn show_banner(&mut self) -> Result<()>;

    /// Called before the first chunk of a response.
    fn begin_response(&mut self) -> Result<()>;

    /// Called after a response completes; prints the turn separator.
    fn end_response(&mut self) -> Result<()>;

    fn show_error(&mut self, err: &VoiceGitError) -> Result<()>;

    fn show_farewell(&mut self) -> Result<()>;

    fn show_interrupted(&mut self) -> Result<()>;
}

//! CLI-specific error formatting for user-facing messages.

use crate::error::VoiceGitError;

/// Map a [`VoiceGitError`] to a user-facing help string with actionable guidance.
pub fn format_error_help(err: &VoiceGitError) -> String {
    match err {
        VoiceGitError::Configuration(msg) => {
            format!("Configuration error: {msg}. Check your .env or environment variables")
        }
        VoiceGitError::Authentication(msg) => {
            format!("Authentication failed: {msg}. Check the API key for the selected backend")
        }
        VoiceGitError::Mcp(msg) => {
            format!("MCP error: {msg}. Check VOICEGIT_MCP_COMMAND and VOICEGIT_MCP_ARGS")
        }
        other => format!("{other}"),
    }
}

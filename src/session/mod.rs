//! Interactive chat session: read, answer, record, repeat.

pub mod context;
pub mod history;
pub mod multiplex;
pub mod surface;

pub use context::{window, CONTEXT_WINDOW_TURNS};
pub use history::{Turn, TurnRole};
pub use multiplex::{multiplex, ChunkSink};
pub use surface::{prompt_label, ChatSurface, LineSource};

use tokio_util::sync::CancellationToken;

use crate::agent_loop::AgentLoop;
use crate::backend::BackendResolver;
use crate::config::UserProfile;
use crate::error::{Result, VoiceGitError};

/// Inputs that end the session.
pub const EXIT_PHRASES: [&str; 3] = ["quit", "q", "stop"];

pub fn is_exit_phrase(line: &str) -> bool {
    let line = line.trim();
    EXIT_PHRASES
        .iter()
        .any(|phrase| line.eq_ignore_ascii_case(phrase))
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The user typed an exit phrase.
    Quit,
    EndOfInput,
    /// The cancellation token fired.
    Interrupted,
}

/// Owns the conversation history for one chat.
pub struct Session<B> {
    backend: B,
    agent: AgentLoop,
    history: Vec<Turn>,
    prompt_label: String,
}

impl<B: BackendResolver> Session<B> {
    pub fn new(backend: B, profile: Option<&UserProfile>) -> Self {
        Self {
            backend,
            agent: AgentLoop::default(),
            history: Vec::new(),
            prompt_label: prompt_label(profile),
        }
    }

    pub fn with_agent_loop(mut self, agent: AgentLoop) -> Self {
        self.agent = agent;
        self
    }

    /// Resume from earlier turns.
    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn prompt_label(&self) -> &str {
        &self.prompt_label
    }

    /// Run until an exit phrase, end of input, or cancellation.
    ///
    /// A failed turn is reported on `surface` and the loop continues. Only
    /// surface I/O failures end the session with an error.
    pub async fn run<I, S>(
        &mut self,
        input: &mut I,
        surface: &mut S,
        cancel: &CancellationToken,
    ) -> Result<SessionExit>
    where
        I: LineSource + ?Sized,
        S: ChatSurface + ?Sized,
    {
        surface.show_banner()?;
        loop {
            let line = tokio::select! {
                biased;
                _ = cancel.cancelled() => None,
                line = input.read_line(&self.prompt_label) => Some(line?),
            };
            let Some(line) = line else {
                surface.show_interrupted()?;
                return Ok(SessionExit::Interrupted);
            };
            let Some(line) = line else {
                surface.show_farewell()?;
                return Ok(SessionExit::EndOfInput);
            };
            if is_exit_phrase(&line) {
                surface.show_farewell()?;
                return Ok(SessionExit::Quit);
            }
            if line.trim().is_empty() {
                continue;
            }

            match self.turn(line, surface, cancel).await {
                Ok(()) => {}
                Err(err) if !err.category().is_recoverable() => {
                    surface.show_interrupted()?;
                    return Ok(SessionExit::Interrupted);
                }
                Err(err) => {
                    tracing::warn!(error = %err, category = ?err.category(), "turn failed");
                    surface.show_error(&err)?;
                }
            }
        }
    }

    /// Answer one user line and record both turns.
    ///
    /// On failure the user turn stays in history and no assistant turn is
    /// added. A cancelled turn leaves history untouched.
    pub async fn turn<S>(
        &mut self,
        line: impl Into<String>,
        surface: &mut S,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        S: ChatSurface + ?Sized,
    {
        self.history.push(Turn::user(line));
        match self.answer(surface, cancel).await {
            Ok(response) => {
                self.history.push(Turn::assistant(response));
                surface.end_response()
            }
            Err(VoiceGitError::Cancelled) => {
                self.history.pop();
                Err(VoiceGitError::Cancelled)
            }
            Err(err) => Err(err),
        }
    }

    async fn answer<S>(&self, surface: &mut S, cancel: &CancellationToken) -> Result<String>
    where
        S: ChatSurface + ?Sized,
    {
        let backend = self.backend.resolve()?;
        let context = window(&self.history);
        tracing::debug!(
            history = self.history.len(),
            context = context.len(),
            "starting turn"
        );
        surface.begin_response()?;
        let mut run = self.agent.run(context, &backend, cancel.child_token());
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(VoiceGitError::Cancelled),
            response = multiplex(&mut run, surface) => response,
        };
        if matches!(response, Err(VoiceGitError::Cancelled)) {
            run.shutdown().await;
        }
        response
    }
}

//! Terminal rendering of a chat session.

use std::io::{self, Write};

use async_trait::async_trait;
use crossterm::style::Stylize;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::agent_loop::OutputChunk;
use crate::error::{Result, VoiceGitError};
use crate::session::surface::{
    error_notice, separator, BANNER, EXIT_HINT, FAREWELL, INTERRUPTED, RESPONSE_HEADER,
};
use crate::session::{ChatSurface, ChunkSink, LineSource};

/// Writes session output to a terminal-like writer.
pub struct TerminalSurface<W> {
    out: W,
}

impl TerminalSurface<io::Stdout> {
    pub fn stdout() -> Self {
        Self { out: io::stdout() }
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ChunkSink for TerminalSurface<W> {
    fn write_chunk(&mut self, chunk: &OutputChunk) -> Result<()> {
        match chunk {
            OutputChunk::Text { text } => write!(self.out, "{text}")?,
            OutputChunk::ToolEvent { text } => write!(self.out, "{}", text.as_str().dark_yellow())?,
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> ChatSurface for TerminalSurface<W> {
    fn show_banner(&mut self) -> Result<()> {
        writeln!(self.out, "{}", BANNER.bold().green())?;
        writeln!(self.out, "{EXIT_HINT}")?;
        writeln!(self.out)?;
        Ok(())
    }

    fn begin_response(&mut self) -> Result<()> {
        write!(self.out, "\n{} ", RESPONSE_HEADER.bold().cyan())?;
        self.out.flush()?;
        Ok(())
    }

    fn end_response(&mut self) -> Result<()> {
        writeln!(self.out, "\n{}", separator())?;
        Ok(())
    }

    fn show_error(&mut self, err: &VoiceGitError) -> Result<()> {
        writeln!(self.out, "\n{}", error_notice(err).red())?;
        Ok(())
    }

    fn show_farewell(&mut self) -> Result<()> {
        writeln!(self.out, "{FAREWELL}")?;
        Ok(())
    }

    fn show_interrupted(&mut self) -> Result<()> {
        writeln!(self.out, "\n{}", INTERRUPTED.yellow())?;
        Ok(())
    }
}

/// Reads lines from standard input, printing the prompt to stdout first.
pub struct StdinLines {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinLines {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinLines {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LineSource for StdinLines {
    async fn read_line(&mut self, prompt: &str) -> Result<Option<String>> {
        {
            let mut out = io::stdout();
            write!(out, "{}", prompt.bold())?;
            out.flush()?;
        }
        Ok(self.lines.next_line().await?)
    }
}

//! CLI argument definitions for VoiceGit.

pub mod commands;
pub mod errors;
pub mod terminal;

use clap::{Parser, Subcommand};

/// VoiceGit CLI
#[derive(Parser, Debug)]
#[command(name = "voicegit", version, about = "VoiceGit: chat with a Git agent")]
pub struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show `git status` for the current directory
    Status,
    /// Show `git diff` for the current directory
    Diff,
    /// Save your name and email
    Configure(ConfigureArgs),
    /// Greet the configured user
    Greeter,
    /// Show where the configuration file lives
    Debug,
    /// Start an interactive chat with the Git agent
    Chat(ChatArgs),
}

/// Arguments for `voicegit configure`. Missing values are prompted for.
#[derive(Parser, Debug)]
pub struct ConfigureArgs {
    /// Your full name
    #[arg(long)]
    pub name: Option<String>,

    /// Your email address
    #[arg(long)]
    pub email: Option<String>,
}

/// Arguments for the `chat` subcommand.
#[derive(Parser, Debug)]
pub struct ChatArgs {
    /// Model backend (azure, anthropic); defaults to $VOICEGIT_BACKEND or azure
    #[arg(short, long)]
    pub backend: Option<String>,
}

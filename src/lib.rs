//! VoiceGit: a conversational gateway to a Git agent.
//!
//! A chat session keeps the conversation history, sends the most recent
//! turns to a reasoning loop backed by Azure OpenAI or Anthropic, and streams
//! the answer back while the model calls tools exposed by an MCP server.
//!
//! # Quick Start
//!
//! ```no_run
//! use voicegit::prelude::*;
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> voicegit::error::Result<()> {
//! let selector = BackendSelector::new(GatewayConfig::from_env(), ToolRegistry::empty());
//! let backend = selector.select("anthropic")?;
//! let history = vec![Turn::user("What changed in my last commit?")];
//! let mut run = AgentLoop::default().run(window(&history), &backend, CancellationToken::new());
//! while let Some(chunk) = run.next().await {
//!     print!("{}", chunk?.as_str());
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent_loop;
pub mod backend;
pub mod config;
pub mod error;
pub mod git;
pub mod prelude;
pub mod provider;
pub mod session;
pub mod tools;
pub mod types;
pub mod util;

#[cfg(feature = "mcp")]
pub mod mcp;

#[cfg(feature = "cli")]
pub mod cli;

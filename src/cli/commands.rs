//! CLI command handlers.

use std::io::{BufRead, Write};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use super::terminal::{StdinLines, TerminalSurface};
use super::ChatArgs;
use crate::backend::{BackendKind, BackendSelector, ConfiguredBackend};
use crate::config::{GatewayConfig, McpServerConfig, ProfileStore, SaveOutcome};
use crate::error::{Result, VoiceGitError};
use crate::git::Git;
use crate::mcp::{MCPClient, MCPToolAdapter, StdioServer};
use crate::session::{Session, SessionExit};
use crate::tools::ToolRegistry;

/// Handle `voicegit status`.
pub async fn handle_status(git: &Git, out: &mut dyn Write) -> Result<()> {
    let output = git.status().await?;
    writeln!(out, "{}", output.render())?;
    Ok(())
}

/// Handle `voicegit diff`.
pub async fn handle_diff(git: &Git, out: &mut dyn Write) -> Result<()> {
    let output = git.diff().await?;
    writeln!(out, "{}", output.render())?;
    Ok(())
}

/// Handle `voicegit configure`, prompting on `input` for missing values.
pub fn handle_configure(
    store: &ProfileStore,
    name: Option<String>,
    email: Option<String>,
    input: &mut dyn BufRead,
    out: &mut dyn Write,
) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => prompt(input, out, "Your name")?,
    };
    let email = match email {
        Some(email) => email,
        None => prompt(input, out, "Your email")?,
    };

    match store.save_user(&name, &email)? {
        SaveOutcome::Created => writeln!(out, "✅ Created new config for {name}")?,
        SaveOutcome::Updated => writeln!(out, "✅ Updated config for {name}")?,
    }
    writeln!(out, "👤 Name: {name}")?;
    writeln!(out, "📧 Email: {email}")?;
    Ok(())
}

fn prompt(input: &mut dyn BufRead, out: &mut dyn Write, label: &str) -> Result<String> {
    loop {
        write!(out, "{label}: ")?;
        out.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(VoiceGitError::InvalidArgument(format!(
                "{} is required",
                label.to_lowercase()
            )));
        }
        let value = line.trim();
        if !value.is_empty() {
            return Ok(value.to_string());
        }
    }
}

/// Handle `voicegit greeter`.
pub fn handle_greeter(store: &ProfileStore, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "{}", store.greeting())?;
    Ok(())
}

/// Handle `voicegit debug`.
pub fn handle_debug(store: &ProfileStore, config: &GatewayConfig, out: &mut dyn Write) -> Result<()> {
    writeln!(out, "📁 Config file location: {}", store.path().display())?;
    if store.exists() {
        writeln!(out, "✅ Config file exists")?;
        match store.load() {
            Ok(Some(user)) => writeln!(out, "👤 User: {} <{}>", user.name, user.email)?,
            Ok(None) => writeln!(out, "⚠️ No user record; run `voicegit configure`")?,
            Err(err) => writeln!(out, "❌ Error: {err}")?,
        }
    } else {
        writeln!(out, "⚠️ Config file not found")?;
    }
    writeln!(out, "🤖 Default backend: {}", config.default_backend())?;
    match &config.mcp.command {
        Some(command) => writeln!(out, "🔧 MCP server: {command} {}", config.mcp.args.join(" "))?,
        None => writeln!(out, "🔧 MCP server: not configured (VOICEGIT_MCP_COMMAND)")?,
    }
    Ok(())
}

/// Launch the MCP server and list its tools.
///
/// With no server configured the chat runs without tools.
pub async fn connect_tools(config: &McpServerConfig) -> Result<ToolRegistry> {
    let Some(command) = &config.command else {
        tracing::warn!("VOICEGIT_MCP_COMMAND is not set; chatting without tools");
        return Ok(ToolRegistry::empty());
    };
    let server = StdioServer::new(command.clone(), config.args.clone());
    let client = MCPClient::connect(&server).await?;
    let registry = ToolRegistry::discover(Arc::new(MCPToolAdapter::new(client))).await?;
    tracing::info!(server = %server, tools = registry.len(), "connected to MCP server");
    Ok(registry)
}

/// Handle `voicegit chat`.
pub async fn handle_chat(
    args: &ChatArgs,
    config: GatewayConfig,
    store: &ProfileStore,
    cancel: CancellationToken,
) -> Result<SessionExit> {
    let identifier = args
        .backend
        .clone()
        .unwrap_or_else(|| config.default_backend().to_string());
    if BackendKind::parse(&identifier).is_none() {
        tracing::warn!(backend = %identifier, "unknown backend; every turn will fail");
    }

    let tools = connect_tools(&config.mcp).await?;
    let backend = ConfiguredBackend::new(BackendSelector::new(config, tools), identifier);
    let profile = store.load_or_default();
    let mut session = Session::new(backend, profile.as_ref());

    let mut input = StdinLines::new();
    let mut surface = TerminalSurface::stdout();
    session.run(&mut input, &mut surface, &cancel).await
}

//! Stdio transport: the MCP server runs as a child process.

use rmcp::model::ClientInfo;
use rmcp::service::{ClientInitializeError, ServiceExt};
use rmcp::transport::TokioChildProcess;
use tokio::process::Command;

use super::client::MCPRunningService;

/// Command line of a local MCP server spoken to over stdin/stdout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StdioServer {
    command: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
}

impl StdioServer {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            env: Vec::new(),
        }
    }

    /// Pass an extra environment variable to the child.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Spawn the server and run the initialize handshake.
    pub async fn connect(
        &self,
        client_info: ClientInfo,
    ) -> Result<MCPRunningService, ClientInitializeError> {
        let mut command = Command::new(&self.command);
        command.args(&self.args);
        for (key, value) in &self.env {
            command.env(key, value);
        }
        let transport = TokioChildProcess::new(command).map_err(|error| {
            ClientInitializeError::transport::<TokioChildProcess>(error, "spawn stdio transport")
        })?;

        client_info.into_dyn().serve(transport).await
    }
}

impl std::fmt::Display for StdioServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

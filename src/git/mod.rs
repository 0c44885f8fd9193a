//! Thin wrappers over the `git` executable.

use std::path::{Path, PathBuf};

use tokio::process::Command;

use crate::error::Result;

/// Captured result of one git invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOutput {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl GitOutput {
    /// Stdout on success, otherwise `Error <stderr>`.
    pub fn render(&self) -> String {
        if self.success {
            self.stdout.clone()
        } else {
            format!("Error {}", self.stderr)
        }
    }
}

/// Runs git in a fixed working directory (the process cwd by default).
#[derive(Debug, Clone, Default)]
pub struct Git {
    dir: Option<PathBuf>,
}

impl Git {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: Some(dir.as_ref().to_path_buf()),
        }
    }

    pub async fn status(&self) -> Result<GitOutput> {
        self.run(&["status"]).await
    }

    pub async fn diff(&self) -> Result<GitOutput> {
        self.run(&["diff"]).await
    }

    /// Spawning failures (git missing) are errors; a non-zero exit is not.
    pub async fn run(&self, args: &[&str]) -> Result<GitOutput> {
        let mut command = Command::new("git");
        command.args(args);
        if let Some(dir) = &self.dir {
            command.current_dir(dir);
        }
        tracing::debug!(?args, dir = ?self.dir, "running git");
        let output = command.output().await?;
        Ok(GitOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

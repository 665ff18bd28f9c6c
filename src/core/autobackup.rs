//! Invocation of the external `zfs-autobackup` tool.

use std::process::Stdio;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::process::Command;

/// Captured result of one backup-tool run.
#[derive(Debug, Clone)]
pub struct BackupRun {
    /// True when the tool reported zero failed datasets (exit status 0).
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait BackupInvoker: Send + Sync {
    /// Execute the transfer with the given argument list. This is the
    /// potentially long-running call; no timeout is enforced here.
    async fn invoke(&self, args: &[String]) -> Result<BackupRun>;
}

/// Runs the `zfs-autobackup` CLI as a child process with output capture.
pub struct ZfsAutobackupCli {
    program: String,
}

impl ZfsAutobackupCli {
    pub fn new() -> Self {
        Self {
            program: "zfs-autobackup".to_string(),
        }
    }
}

impl Default for ZfsAutobackupCli {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackupInvoker for ZfsAutobackupCli {
    async fn invoke(&self, args: &[String]) -> Result<BackupRun> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .with_context(|| format!("failed to run {}", self.program))?;

        if !output.status.success() {
            tracing::error!(code = ?output.status.code(), "zfs-autobackup exited with an error");
        }

        Ok(BackupRun {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

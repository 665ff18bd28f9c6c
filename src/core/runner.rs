//! External command execution with output capture.

use std::process::Stdio;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Captured result of one child process run.
///
/// A non-zero exit is data, not an error; callers inspect [`success`].
///
/// [`success`]: CommandOutput::success
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, or `None` when the child was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run `command`, optionally piping `input` to the child's stdin, and
    /// capture both output streams as text. Returns `Err` only when the
    /// process could not be spawned or its streams could not be read.
    async fn run(&self, command: &[String], input: Option<&str>) -> Result<CommandOutput>;
}

/// Runs commands as real child processes via `tokio::process`.
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, command: &[String], input: Option<&str>) -> Result<CommandOutput> {
        let (program, args) = command
            .split_first()
            .ok_or_else(|| anyhow!("empty command"))?;

        let mut child = Command::new(program)
            .args(args)
            .stdin(if input.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to spawn {program}"))?;

        // Feed stdin from a separate task while wait_with_output drains the
        // output pipes; writing first and waiting after can deadlock once
        // input and output both exceed the pipe buffers.
        let writer = match input {
            Some(text) => {
                let mut stdin = child
                    .stdin
                    .take()
                    .ok_or_else(|| anyhow!("child stdin not captured"))?;
                let text = text.to_owned();
                Some(tokio::spawn(async move {
                    // EPIPE just means the child exited without reading;
                    // its exit status tells the real story.
                    if let Err(error) = stdin.write_all(text.as_bytes()).await {
                        tracing::debug!(%error, "child closed stdin before input was written");
                    }
                    // Drop closes the pipe so the child sees EOF.
                }))
            }
            None => None,
        };

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("failed to wait for {program}"))?;

        if let Some(writer) = writer {
            let _ = writer.await;
        }

        let result = CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };

        if !result.success() {
            tracing::warn!(
                command = %command.join(" "),
                code = ?result.code,
                "command returned non-zero exit status"
            );
        }

        Ok(result)
    }
}

//! The ordered import → decrypt → backup → read-only → export sequence.
//!
//! Each step runs only if every previous step succeeded. The ordering
//! encodes a safety property: a pool is never exported unless its backup
//! provably succeeded, and it is made read-only before export so a reconnect
//! cannot write to it before the disk is ejected.

use std::sync::Arc;

use anyhow::Result;

use crate::config::PoolConfig;
use crate::core::autobackup::BackupInvoker;
use crate::core::runner::CommandRunner;

/// Result of one pipeline run, passed to the notifier and discarded.
///
/// On success the message carries the backup tool's captured stdout; on
/// failure it states which step failed, what state the pool was left in,
/// and appends the raw error text from the underlying tool.
#[derive(Debug, Clone)]
pub struct BackupOutcome {
    pub success: bool,
    pub message: String,
}

impl BackupOutcome {
    fn succeeded(message: String) -> Self {
        Self {
            success: true,
            message,
        }
    }

    fn failed(message: String) -> Self {
        Self {
            success: false,
            message,
        }
    }
}

pub struct BackupPipeline {
    runner: Arc<dyn CommandRunner>,
    invoker: Arc<dyn BackupInvoker>,
}

impl BackupPipeline {
    pub fn new(runner: Arc<dyn CommandRunner>, invoker: Arc<dyn BackupInvoker>) -> Self {
        Self { runner, invoker }
    }

    /// Run the full sequence for one pool.
    ///
    /// Step failures are reported through the returned [`BackupOutcome`],
    /// never as `Err`; only unanticipated conditions (a command that cannot
    /// be spawned) propagate, up to the per-event handler.
    pub async fn run(&self, pool: &PoolConfig) -> Result<BackupOutcome> {
        let name = pool.name.as_str();

        tracing::debug!(pool = %name, "importing pool");
        let import = self
            .runner
            .run(&command(["zpool", "import", name, "-N"]), None)
            .await?;
        if !import.success() {
            return Ok(BackupOutcome::failed(format!(
                "Failed to import pool. Backup not yet run.\n{}",
                import.stderr
            )));
        }

        if let Some(passphrase) = &pool.passphrase {
            tracing::debug!(pool = %name, "decrypting pool");
            let unlock = self
                .runner
                .run(&command(["zfs", "load-key", name]), Some(passphrase.expose()))
                .await?;
            if !unlock.success() {
                return Ok(BackupOutcome::failed(format!(
                    "Failed to decrypt pool. Backup not yet run.\n{}",
                    unlock.stderr
                )));
            }
        }

        tracing::info!(
            pool = %name,
            parameters = %pool.autobackup_parameters.join(" "),
            "starting zfs-autobackup"
        );
        let backup = self.invoker.invoke(&pool.autobackup_parameters).await?;
        // Conservative: stderr output counts as failure even when the tool
        // itself reported success, so a disk with warnings stays imported.
        if !backup.success || !backup.stderr.is_empty() {
            tracing::error!(pool = %name, "zfs-autobackup failed");
            return Ok(BackupOutcome::failed(format!(
                "ZFS autobackup error! Disk will not be exported automatically.\n{}{}",
                backup.stderr, backup.stdout
            )));
        }
        if !backup.stdout.is_empty() {
            tracing::info!(pool = %name, output = %backup.stdout.trim_end(), "zfs-autobackup finished");
        }

        tracing::debug!(pool = %name, "setting pool read-only");
        let readonly = self
            .runner
            .run(&command(["zfs", "set", "readonly=on", name]), None)
            .await?;
        if !readonly.success() {
            return Ok(BackupOutcome::failed(format!(
                "Failed to set pool read-only. Backup succeeded, but the disk will not be \
                 exported automatically.\n{}\n{}",
                readonly.stderr, backup.stdout
            )));
        }

        tracing::debug!(pool = %name, "exporting pool");
        let export = self
            .runner
            .run(&command(["zpool", "export", name]), None)
            .await?;
        if !export.success() {
            return Ok(BackupOutcome::failed(format!(
                "Failed to export pool. Backup succeeded, but the disk will not be \
                 ejected automatically.\n{}\n{}",
                export.stderr, backup.stdout
            )));
        }

        Ok(BackupOutcome::succeeded(backup.stdout))
    }
}

fn command<const N: usize>(parts: [&str; N]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

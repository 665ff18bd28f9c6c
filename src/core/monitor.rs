//! The device monitor: consumes hotplug events, dispatches backups, and
//! nags until finished devices are unplugged.
//!
//! The loop is the single consumer of the event channel and runs each
//! pipeline to completion before looking at the next event, so pool
//! import/export is never concurrent within this process.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::config::AppConfig;
use crate::core::alert::Alerter;
use crate::core::hardware::DeviceEvent;
use crate::core::notifications::Notifier;
use crate::core::pipeline::BackupPipeline;

/// How often to re-alert while a finished device stays connected.
pub const NAG_INTERVAL: Duration = Duration::from_secs(10);

/// udev maintains one symlink per labelled filesystem here.
const BY_LABEL_DIR: &str = "/dev/disk/by-label";

pub struct Monitor {
    config: Arc<AppConfig>,
    pipeline: BackupPipeline,
    notifiers: Vec<Arc<dyn Notifier>>,
    alerter: Arc<dyn Alerter>,
}

enum Next {
    Event(DeviceEvent),
    NagElapsed,
    Closed,
}

impl Monitor {
    pub fn new(
        config: Arc<AppConfig>,
        pipeline: BackupPipeline,
        notifiers: Vec<Arc<dyn Notifier>>,
        alerter: Arc<dyn Alerter>,
    ) -> Self {
        Self {
            config,
            pipeline,
            notifiers,
            alerter,
        }
    }

    /// Consume events until the channel closes or `shutdown` fires.
    ///
    /// Idle (no finished devices): block indefinitely for the next event.
    /// Awaiting removal (finished devices present): block with a timeout and
    /// beep on each elapse without consuming an event.
    pub async fn run(&self, mut rx: mpsc::UnboundedReceiver<DeviceEvent>, shutdown: CancellationToken) {
        let mut labels: Vec<&str> = self.config.pools.keys().map(String::as_str).collect();
        labels.sort_unstable();
        tracing::info!(pools = %labels.join(", "), "waiting for devices");

        let mut finished: HashSet<String> = HashSet::new();

        loop {
            let next = tokio::select! {
                _ = shutdown.cancelled() => break,
                next = next_event(&mut rx, !finished.is_empty()) => next,
            };

            let event = match next {
                Next::Event(event) => event,
                Next::NagElapsed => {
                    // A finished device is still connected.
                    self.beep();
                    continue;
                }
                Next::Closed => break,
            };

            if let Err(error) = self.handle_event(event, &mut finished).await {
                tracing::error!(error = %format!("{error:#}"), "unexpected error while handling device event");
                self.notify(
                    "Unexpected error",
                    &format!(
                        "An unexpected error occurred. Backup has probably failed. \
                         Please investigate.\nError: {error:#}"
                    ),
                )
                .await;
            }
        }

        tracing::info!("shutting down");
    }

    async fn handle_event(
        &self,
        event: DeviceEvent,
        finished: &mut HashSet<String>,
    ) -> Result<()> {
        match event {
            DeviceEvent::Added(label) => {
                if !self.config.pools.contains_key(&label) {
                    tracing::info!(%label, "unrecognized disk");
                    self.notify(
                        "Unrecognized disk",
                        &format!(
                            "Plugged in disk {label} that is not matching any configuration. \
                             You can unplug it again safely."
                        ),
                    )
                    .await;
                    return Ok(());
                }

                self.beep();
                tracing::info!(pool = %label, "pool has been added, starting backup");
                let result = self.pipeline.run(&self.config.pools[&label]).await;
                // The device is connected either way; nag until unplugged.
                finished.insert(label.clone());
                let outcome = result?;

                if outcome.success {
                    tracing::info!(pool = %label, "backup completed");
                    self.notify(
                        &format!("Backup of {label} completed"),
                        &format!(
                            "Backup finished. You can safely unplug the disk {label} now.\n\n{}",
                            outcome.message
                        ),
                    )
                    .await;
                } else {
                    self.notify(&format!("Error backing up {label}"), &outcome.message)
                        .await;
                }
            }
            DeviceEvent::Removed(label) => {
                // Idempotent: removal of an unknown or already-cleared label
                // is a no-op.
                if finished.remove(&label) {
                    tracing::debug!(pool = %label, "finished device removed");
                }
            }
        }
        Ok(())
    }

    /// Run every configured pool whose device is currently connected once,
    /// printing outcomes instead of notifying. Bypasses the event source.
    pub async fn run_once(&self) -> Result<()> {
        let mut names: Vec<&String> = self.config.pools.keys().collect();
        names.sort_unstable();

        for name in names {
            if !device_connected_in(Path::new(BY_LABEL_DIR), name) {
                continue;
            }
            println!("Starting manual backup on pool {name}...");
            let outcome = self.pipeline.run(&self.config.pools[name]).await?;
            println!("{}", outcome.message);
        }
        Ok(())
    }

    async fn notify(&self, subject: &str, body: &str) {
        for notifier in &self.notifiers {
            if let Err(error) = notifier.notify(subject, body).await {
                tracing::warn!(%subject, error = %format!("{error:#}"), "failed to deliver notification");
            }
        }
    }

    fn beep(&self) {
        if self.config.beep {
            self.alerter.alert();
        }
    }
}

async fn next_event(rx: &mut mpsc::UnboundedReceiver<DeviceEvent>, nagging: bool) -> Next {
    if nagging {
        match timeout(NAG_INTERVAL, rx.recv()).await {
            Ok(Some(event)) => Next::Event(event),
            Ok(None) => Next::Closed,
            Err(_elapsed) => Next::NagElapsed,
        }
    } else {
        match rx.recv().await {
            Some(event) => Next::Event(event),
            None => Next::Closed,
        }
    }
}

fn device_connected_in(dir: &Path, label: &str) -> bool {
    dir.join(label)
        .symlink_metadata()
        .map(|meta| meta.file_type().is_symlink())
        .unwrap_or(false)
}

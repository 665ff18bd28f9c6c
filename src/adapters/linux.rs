//! udev-backed event source: watches the `block` subsystem over netlink and
//! forwards add/remove events for labelled ZFS member devices.

use std::os::fd::{AsRawFd, BorrowedFd};

use anyhow::{Context, Result};
use nix::errno::Errno;
use nix::poll::{PollFd, PollFlags, PollTimeout, poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::core::hardware::{DeviceEvent, HardwareAdapter};

const ZFS_MEMBER: &str = "zfs_member";
/// Poll granularity; bounds how long stop() can go unnoticed.
const POLL_INTERVAL_MS: u16 = 1000;

pub struct LinuxAdapter {
    cancel: CancellationToken,
}

impl LinuxAdapter {
    pub fn new() -> Self {
        Self {
            cancel: CancellationToken::new(),
        }
    }
}

impl Default for LinuxAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl HardwareAdapter for LinuxAdapter {
    fn start(&self, events: mpsc::UnboundedSender<DeviceEvent>) {
        let cancel = self.cancel.clone();
        let spawned = std::thread::Builder::new()
            .name("udev-monitor".to_string())
            .spawn(move || {
                if let Err(error) = watch_udev(events, cancel) {
                    tracing::error!(error = %format!("{error:#}"), "udev monitor failed");
                }
            });
        if let Err(error) = spawned {
            tracing::error!(%error, "failed to spawn udev monitor thread");
        }
    }

    fn stop(&self) {
        self.cancel.cancel();
    }
}

fn watch_udev(events: mpsc::UnboundedSender<DeviceEvent>, cancel: CancellationToken) -> Result<()> {
    let socket = udev::MonitorBuilder::new()
        .context("failed to create udev monitor")?
        .match_subsystem("block")
        .context("failed to filter udev monitor to block devices")?
        .listen()
        .context("failed to listen on udev netlink socket")?;
    tracing::debug!("udev monitor listening on block subsystem");

    while !cancel.is_cancelled() {
        // The socket stays alive for the whole loop; borrowing its fd per
        // poll round is sound.
        let fd = unsafe { BorrowedFd::borrow_raw(socket.as_raw_fd()) };
        let mut fds = [PollFd::new(fd, PollFlags::POLLIN)];
        match poll(&mut fds, PollTimeout::from(POLL_INTERVAL_MS)) {
            Ok(0) => continue,
            Ok(_) => {}
            Err(Errno::EINTR) => continue,
            Err(errno) => return Err(errno).context("poll on udev socket failed"),
        }

        for event in socket.iter() {
            let Some(device_event) = classify(&event) else {
                continue;
            };
            tracing::debug!(event = ?device_event, "udev observed labelled zfs member");
            // Unbounded send: the consumer may be mid-backup for hours and
            // must never stall this thread. A closed channel means shutdown.
            if events.send(device_event).is_err() {
                return Ok(());
            }
        }
    }

    Ok(())
}

/// Keep only add/remove of block devices carrying a ZFS member filesystem
/// with a label. All labels are forwarded; the monitor decides whether a
/// label is configured.
fn classify(event: &udev::Event) -> Option<DeviceEvent> {
    let fs_type = event.property_value("ID_FS_TYPE")?.to_str()?;
    if fs_type != ZFS_MEMBER {
        return None;
    }
    let label = event.property_value("ID_FS_LABEL")?.to_str()?;
    if label.is_empty() {
        return None;
    }

    match event.event_type() {
        udev::EventType::Add => Some(DeviceEvent::Added(label.to_string())),
        udev::EventType::Remove => Some(DeviceEvent::Removed(label.to_string())),
        _ => None,
    }
}

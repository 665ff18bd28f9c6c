use tokio::sync::mpsc;

/// A hotplug notification for a labelled ZFS member device.
///
/// Carries only the filesystem label; whether the label maps to a configured
/// pool is the monitor's decision, not the event source's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceEvent {
    Added(String),
    Removed(String),
}

impl DeviceEvent {
    pub fn label(&self) -> &str {
        match self {
            DeviceEvent::Added(label) | DeviceEvent::Removed(label) => label,
        }
    }
}

pub trait HardwareAdapter: Send + Sync {
    /// Start listening for device events.
    /// Spawns an internal thread/task that sends events to the provided
    /// channel. The channel is unbounded so enqueueing never blocks the
    /// producer, however long the consumer spends on a backup.
    fn start(&self, events: mpsc::UnboundedSender<DeviceEvent>);

    /// Stop the event source gracefully.
    fn stop(&self);
}

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::core::hardware::{DeviceEvent, HardwareAdapter};

/// Injects device events without real hardware; the controller half of
/// [`SimulatedAdapter::new`].
#[derive(Clone)]
pub struct Simulator {
    tx: mpsc::UnboundedSender<DeviceEvent>,
}

impl Simulator {
    pub fn plug(&self, label: &str) {
        let _ = self.tx.send(DeviceEvent::Added(label.to_string()));
    }

    pub fn unplug(&self, label: &str) {
        let _ = self.tx.send(DeviceEvent::Removed(label.to_string()));
    }
}

pub struct SimulatedAdapter {
    // We wrap the receiver in a Mutex so we can move it out inside `start()`
    // which takes &self. (Start is only called once.)
    cmd_rx: Arc<Mutex<Option<mpsc::UnboundedReceiver<DeviceEvent>>>>,
}

impl SimulatedAdapter {
    pub fn new() -> (Self, Simulator) {
        let (tx, rx) = mpsc::unbounded_channel();

        (
            Self {
                cmd_rx: Arc::new(Mutex::new(Some(rx))),
            },
            Simulator { tx },
        )
    }
}

impl HardwareAdapter for SimulatedAdapter {
    fn start(&self, events: mpsc::UnboundedSender<DeviceEvent>) {
        // Steal the receiver from the mutex
        let mut rx = self
            .cmd_rx
            .lock()
            .unwrap()
            .take()
            .expect("SimulatedAdapter::start() called twice");

        // Bridge task
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if events.send(event).is_err() {
                    break;
                }
            }
        });
    }

    fn stop(&self) {}
}

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use zbakd::adapters::SimulatedAdapter;
use zbakd::core::{DeviceEvent, HardwareAdapter};

#[tokio::test]
async fn test_plug_device() {
    let (adapter, controller) = SimulatedAdapter::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    adapter.start(tx);

    controller.plug("TANK1");

    let event = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timeout waiting for event")
        .expect("channel closed");

    assert_eq!(event, DeviceEvent::Added("TANK1".to_string()));
    assert_eq!(event.label(), "TANK1");
}

#[tokio::test]
async fn test_unplug_device() {
    let (adapter, controller) = SimulatedAdapter::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    adapter.start(tx);

    controller.unplug("TANK2");

    let event = timeout(Duration::from_secs(1), rx.recv())
        .await
        .expect("timeout waiting for event")
        .expect("channel closed");

    assert_eq!(event, DeviceEvent::Removed("TANK2".to_string()));
}

#[tokio::test]
async fn test_events_keep_order() {
    let (adapter, controller) = SimulatedAdapter::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    adapter.start(tx);

    controller.plug("TANK1");
    controller.plug("TANK2");
    controller.unplug("TANK1");

    let mut events = Vec::new();
    for _ in 0..3 {
        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timeout")
            .expect("channel closed");
        events.push(event);
    }

    assert_eq!(
        events,
        [
            DeviceEvent::Added("TANK1".to_string()),
            DeviceEvent::Added("TANK2".to_string()),
            DeviceEvent::Removed("TANK1".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_burst_without_consumer_does_not_stall() {
    let (adapter, controller) = SimulatedAdapter::new();
    let (tx, mut rx) = mpsc::unbounded_channel();

    adapter.start(tx);

    // Nobody reads while the events pile up, mimicking a consumer busy with
    // a long backup. Every send must complete immediately.
    for i in 0..100 {
        controller.plug(&format!("TANK{i}"));
    }

    let mut received = 0;
    while received < 100 {
        timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timeout draining events")
            .expect("channel closed");
        received += 1;
    }
    assert_eq!(received, 100);
}

#[tokio::test]
async fn test_stop() {
    let (adapter, _controller) = SimulatedAdapter::new();
    let (tx, _rx) = mpsc::unbounded_channel();

    adapter.start(tx);
    adapter.stop(); // Should not panic
}

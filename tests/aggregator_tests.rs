// Aggregator: combine-latest over the three facet cells, typed + JSON outputs

mod common;

use std::time::Duration;

use common::{platform_sources, test_config, test_platform, wifi_connection};
use devicemonitor::device_monitor::DeviceMonitor;
use devicemonitor::models::{AudioStatus, DeviceStatus, NetworkStatus, PowerStatus};
use serde_json::{Value, json};
use tokio::sync::watch;

/// Waits for a composite matching the predicate on the typed stream.
async fn status_until(
    rx: &mut watch::Receiver<DeviceStatus>,
    predicate: impl Fn(&DeviceStatus) -> bool,
) -> DeviceStatus {
    loop {
        {
            let current = rx.borrow_and_update();
            if predicate(&current) {
                return current.clone();
            }
        }
        tokio::time::timeout(Duration::from_secs(10), rx.changed())
            .await
            .expect("timed out waiting for matching composite")
            .expect("status stream closed");
    }
}

#[tokio::test(start_paused = true)]
async fn first_composite_contains_every_facet() {
    let platform = test_platform();
    let monitor = DeviceMonitor::new(platform_sources(&platform), &test_config()).expect("monitor");

    let status = monitor.subscribe_status().borrow().clone();
    assert!(matches!(status.network_status, NetworkStatus::Unknown { .. }));
    assert!(matches!(status.power_status, PowerStatus::Available { .. }));
    assert!(matches!(status.audio_status, AudioStatus::Unknown {}));
}

#[tokio::test(start_paused = true)]
async fn facet_change_publishes_composite_with_latest_of_the_others() {
    let platform = test_platform();
    let monitor = DeviceMonitor::new(platform_sources(&platform), &test_config()).expect("monitor");
    let mut status_rx = monitor.subscribe_status();

    platform.set_power_modes(true, false);
    let status = status_until(&mut status_rx, |s| {
        matches!(
            s.power_status,
            PowerStatus::Available {
                is_power_save_mode: true,
                ..
            }
        )
    })
    .await;
    // The other facets ride along with their latest known values.
    assert!(matches!(status.network_status, NetworkStatus::Unknown { .. }));
    assert!(matches!(status.audio_status, AudioStatus::Unknown {}));
}

#[tokio::test(start_paused = true)]
async fn network_change_flows_into_the_composite() {
    let platform = test_platform();
    let monitor = DeviceMonitor::new(platform_sources(&platform), &test_config()).expect("monitor");
    let mut status_rx = monitor.subscribe_status();

    platform.bring_up(wifi_connection());
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let status = status_until(&mut status_rx, |s| {
        matches!(s.network_status, NetworkStatus::Connected { .. })
    })
    .await;
    match status.network_status {
        NetworkStatus::Connected {
            available_connection_status: Some(c),
            ..
        } => assert!(c.using_wifi),
        other => panic!("expected Connected(wifi), got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn json_stream_carries_serialized_composites() {
    let platform = test_platform();
    let monitor = DeviceMonitor::new(platform_sources(&platform), &test_config()).expect("monitor");
    let mut json_rx = monitor.subscribe_json();

    platform.set_power_modes(true, true);
    let value = loop {
        let line = tokio::time::timeout(Duration::from_secs(10), json_rx.recv())
            .await
            .expect("timed out waiting for snapshot")
            .expect("snapshot stream closed");
        let value: Value = serde_json::from_str(&line).expect("valid JSON snapshot");
        if value["powerStatus"]["isPowerSaveMode"] == json!(true) {
            break value;
        }
    };
    assert_eq!(value["powerStatus"]["isDeviceIdleMode"], json!(true));
    assert!(value.get("networkStatus").is_some());
    assert!(value.get("audioStatus").is_some());
    assert!(monitor.snapshots_published_total() >= 1);
}

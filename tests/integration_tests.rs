// End-to-end: scripted platform activity through monitors, aggregator, and
// the serialized snapshot stream

mod common;

use std::time::Duration;

use common::{cellular_connection, platform_sources, test_config, test_platform, wifi_connection};
use devicemonitor::device_monitor::DeviceMonitor;
use devicemonitor::sources::AudioDeviceKind;
use serde_json::{Value, json};
use tokio::sync::broadcast;

async fn recv_until(
    rx: &mut broadcast::Receiver<String>,
    predicate: impl Fn(&Value) -> bool,
) -> Value {
    loop {
        let line = tokio::time::timeout(Duration::from_secs(15), rx.recv())
            .await
            .expect("timed out waiting for matching snapshot")
            .expect("snapshot stream closed");
        let value: Value = serde_json::from_str(&line).expect("valid JSON snapshot");
        if predicate(&value) {
            return value;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn scripted_scenario_produces_expected_snapshots() {
    let platform = test_platform();
    let monitor = DeviceMonitor::new(platform_sources(&platform), &test_config()).expect("monitor");
    monitor.audio().start_tracking().expect("start audio tracking");
    let mut json_rx = monitor.subscribe_json();

    // Speaker output plus WiFi.
    platform.attach_output(AudioDeviceKind::BuiltinSpeaker, true);
    let wifi = platform.bring_up(wifi_connection());
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let connected = recv_until(&mut json_rx, |v| {
        v["networkStatus"]["activeConnectionStatus"]["usingWiFi"] == json!(true)
    })
    .await;
    assert_eq!(connected["audioStatus"]["device"], json!("Phone Speaker"));
    assert_eq!(connected["powerStatus"]["isPowerSaveMode"], json!(false));

    // Battery saver kicks in; the network facet rides along unchanged.
    platform.set_power_modes(true, false);
    let save_on = recv_until(&mut json_rx, |v| {
        v["powerStatus"]["isPowerSaveMode"] == json!(true)
    })
    .await;
    assert_eq!(
        save_on["networkStatus"]["activeConnectionStatus"]["usingWiFi"],
        json!(true)
    );

    // Bluetooth takes over the output.
    platform.attach_output(AudioDeviceKind::BluetoothA2dp, true);
    let bluetooth = recv_until(&mut json_rx, |v| {
        v["audioStatus"]["device"] == json!("Bluetooth")
    })
    .await;
    assert_eq!(bluetooth["powerStatus"]["isPowerSaveMode"], json!(true));

    // Airplane mode on, WiFi drops, then cellular comes back.
    platform.set_airplane_mode(true);
    platform.drop_network(wifi);
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let airplane = recv_until(&mut json_rx, |v| {
        v["networkStatus"]["isInAirplaneMode"] == json!(true)
    })
    .await;
    assert_eq!(
        airplane["networkStatus"]["activeConnectionStatus"],
        Value::Null
    );

    platform.set_airplane_mode(false);
    platform.bring_up(cellular_connection());
    tokio::time::sleep(Duration::from_millis(1500)).await;
    let cellular = recv_until(&mut json_rx, |v| {
        v["networkStatus"]["activeConnectionStatus"]["usingCellular"] == json!(true)
            && v["networkStatus"]["isInAirplaneMode"] == json!(false)
    })
    .await;
    assert_eq!(cellular["audioStatus"]["device"], json!("Bluetooth"));

    monitor.shutdown().await.expect("shutdown");
}

#[tokio::test(start_paused = true)]
async fn snapshot_stream_closes_after_shutdown() {
    let platform = test_platform();
    let monitor = DeviceMonitor::new(platform_sources(&platform), &test_config()).expect("monitor");
    let mut json_rx = monitor.subscribe_json();

    monitor.shutdown().await.expect("shutdown");
    // Drain whatever was published, then observe the closed channel.
    loop {
        match json_rx.recv().await {
            Ok(_) => continue,
            Err(broadcast::error::RecvError::Lagged(_)) => continue,
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

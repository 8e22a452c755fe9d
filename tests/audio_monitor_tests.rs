// Audio monitor: explicit tracking lifecycle, device labeling, no duplicate suppression

mod common;

use common::test_platform;
use devicemonitor::audio_monitor::AudioStatusMonitor;
use devicemonitor::models::AudioStatus;
use devicemonitor::sources::{AudioDeviceKind, SourceError};

fn available(device: &str) -> AudioStatus {
    AudioStatus::Available {
        device: device.into(),
    }
}

#[tokio::test]
async fn unknown_until_tracking_starts() {
    let platform = test_platform();
    let monitor = AudioStatusMonitor::new(platform.clone());
    assert_eq!(monitor.current(), AudioStatus::Unknown {});
    assert_eq!(platform.audio_registrations(), 0);
}

#[tokio::test]
async fn start_tracking_registers_and_evaluates_once() {
    let platform = test_platform();
    platform.attach_output(AudioDeviceKind::BuiltinSpeaker, true);
    let monitor = AudioStatusMonitor::new(platform.clone());

    monitor.start_tracking().expect("start");
    assert_eq!(platform.audio_registrations(), 1);
    assert_eq!(monitor.current(), available("Phone Speaker"));
}

#[tokio::test]
async fn active_bluetooth_device_maps_to_bluetooth() {
    let platform = test_platform();
    platform.attach_output(AudioDeviceKind::BuiltinSpeaker, true);
    let monitor = AudioStatusMonitor::new(platform.clone());
    monitor.start_tracking().expect("start");
    let mut rx = monitor.subscribe();

    platform.attach_output(AudioDeviceKind::BluetoothA2dp, true);
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), available("Bluetooth"));
}

#[tokio::test]
async fn unrecognized_kind_maps_to_unknown() {
    let platform = test_platform();
    let monitor = AudioStatusMonitor::new(platform.clone());
    monitor.start_tracking().expect("start");
    let mut rx = monitor.subscribe();

    platform.attach_output(AudioDeviceKind::Other, true);
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), available("Unknown"));
}

#[tokio::test]
async fn no_active_device_maps_to_unknown() {
    let platform = test_platform();
    platform.attach_output(AudioDeviceKind::UsbHeadset, false);
    let monitor = AudioStatusMonitor::new(platform.clone());
    monitor.start_tracking().expect("start");
    assert_eq!(monitor.current(), available("Unknown"));
}

#[tokio::test]
async fn identical_evaluations_are_not_suppressed() {
    let platform = test_platform();
    platform.attach_output(AudioDeviceKind::BuiltinSpeaker, true);
    let monitor = AudioStatusMonitor::new(platform.clone());
    monitor.start_tracking().expect("start");
    let mut rx = monitor.subscribe();

    // Two adds that leave the active device untouched still produce two
    // emissions of the same value.
    platform.attach_output(AudioDeviceKind::Other, false);
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), available("Phone Speaker"));

    platform.attach_output(AudioDeviceKind::Other, false);
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), available("Phone Speaker"));
}

#[tokio::test]
async fn detaching_active_output_falls_back_to_unknown() {
    let platform = test_platform();
    let speaker = platform.attach_output(AudioDeviceKind::BuiltinSpeaker, true);
    let monitor = AudioStatusMonitor::new(platform.clone());
    monitor.start_tracking().expect("start");
    let mut rx = monitor.subscribe();

    platform.detach_output(speaker);
    rx.changed().await.unwrap();
    assert_eq!(*rx.borrow_and_update(), available("Unknown"));
}

#[tokio::test]
async fn tracking_lifecycle_misuse_fails_loudly() {
    let platform = test_platform();
    let monitor = AudioStatusMonitor::new(platform.clone());

    assert!(matches!(
        monitor.stop_tracking(),
        Err(SourceError::NotRegistered)
    ));

    monitor.start_tracking().expect("start");
    assert!(matches!(
        monitor.start_tracking(),
        Err(SourceError::AlreadyRegistered)
    ));

    monitor.stop_tracking().expect("stop");
    assert!(matches!(
        monitor.stop_tracking(),
        Err(SourceError::NotRegistered)
    ));

    // A stopped monitor can be started again; that counts as a new registration.
    monitor.start_tracking().expect("restart");
    assert_eq!(platform.audio_registrations(), 2);
}

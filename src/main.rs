use anyhow::Result;
use devicemonitor::*;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Duration, sleep};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use devicemonitor::models::ConnectionSnapshot;
use devicemonitor::sources::AudioDeviceKind;
use devicemonitor::sources::sim::SimPlatform;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting device monitor");

    // The demo runs against the in-memory platform; one object backs all four
    // source contracts, the way one OS backs them on a real host.
    let platform = Arc::new(SimPlatform::with_event_capacity(
        app_config.monitoring.event_channel_capacity,
    ));
    let monitor = device_monitor::DeviceMonitor::new(
        device_monitor::DeviceMonitorSources {
            connectivity: platform.clone(),
            airplane: platform.clone(),
            power: platform.clone(),
            audio: platform.clone(),
        },
        &app_config,
    )?;
    monitor.audio().start_tracking()?;

    let mut json_rx = monitor.subscribe_json();
    let consumer = tokio::spawn(async move {
        loop {
            match json_rx.recv().await {
                Ok(snapshot) => {
                    tracing::info!(operation = "device_status", %snapshot, "status changed");
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!("snapshot consumer lagged, skipped {} messages", n);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let scenario = tokio::spawn(run_scenario(
        platform.clone(),
        app_config.demo.step_interval_ms,
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received shutdown signal");
    scenario.abort();
    monitor.shutdown().await?;
    consumer.abort();

    Ok(())
}

/// Scripted host activity: speaker → WiFi → battery saver → Bluetooth →
/// airplane mode → LTE, paced by the configured step interval.
async fn run_scenario(platform: Arc<SimPlatform>, step_interval_ms: u64) {
    let step = Duration::from_millis(step_interval_ms);

    platform.attach_output(AudioDeviceKind::BuiltinSpeaker, true);
    sleep(step).await;

    let wifi = platform.bring_up(ConnectionSnapshot {
        using_wifi: true,
        using_cellular: false,
        using_vpn: false,
        is_validated: true,
        is_behind_captive_portal: false,
        is_not_metered: true,
    });
    sleep(step).await;

    platform.set_power_modes(true, false);
    sleep(step).await;

    platform.attach_output(AudioDeviceKind::BluetoothA2dp, true);
    sleep(step).await;

    platform.set_airplane_mode(true);
    platform.drop_network(wifi);
    sleep(step).await;

    platform.set_airplane_mode(false);
    platform.bring_up(ConnectionSnapshot {
        using_wifi: false,
        using_cellular: true,
        using_vpn: false,
        is_validated: true,
        is_behind_captive_portal: false,
        is_not_metered: false,
    });

    tracing::info!("demo scenario complete; ctrl-c to exit");
}

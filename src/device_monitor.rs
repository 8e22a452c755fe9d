// Registry owning one monitor per capability plus the aggregator wiring.
// Replaces hidden process-wide singletons: built once at bootstrap, passed by
// reference to consumers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;

use crate::aggregator::{self, AggregatorConfig, AggregatorDeps};
use crate::audio_monitor::AudioStatusMonitor;
use crate::config::AppConfig;
use crate::models::DeviceStatus;
use crate::network_monitor::NetworkStatusMonitor;
use crate::power_monitor::PowerStatusMonitor;
use crate::sources::{
    AirplaneModeSource, AudioSource, ConnectivitySource, PowerSource, SourceError,
};

/// One platform collaborator per facet. The same object may back several
/// entries (the sim platform implements all four contracts).
pub struct DeviceMonitorSources {
    pub connectivity: Arc<dyn ConnectivitySource>,
    pub airplane: Arc<dyn AirplaneModeSource>,
    pub power: Arc<dyn PowerSource>,
    pub audio: Arc<dyn AudioSource>,
}

/// One instance per capability, one aggregator over them. Audio tracking is
/// NOT started here: the bootstrap calls `audio().start_tracking()` itself,
/// keeping monitor lifecycle out of snapshot-combination construction.
pub struct DeviceMonitor {
    network: NetworkStatusMonitor,
    power: PowerStatusMonitor,
    audio: AudioStatusMonitor,
    status_rx: watch::Receiver<DeviceStatus>,
    json_tx: broadcast::Sender<String>,
    snapshots_published_total: Arc<AtomicU64>,
    shutdown_tx: oneshot::Sender<()>,
    aggregator_task: JoinHandle<()>,
}

impl DeviceMonitor {
    pub fn new(sources: DeviceMonitorSources, config: &AppConfig) -> Result<Self, SourceError> {
        let network = NetworkStatusMonitor::new(sources.connectivity, sources.airplane)?;
        let power = PowerStatusMonitor::new(sources.power)?;
        let audio = AudioStatusMonitor::new(sources.audio);

        let network_stream = network.subscribe();
        let power_rx = power.subscribe();
        let audio_rx = audio.subscribe();

        let initial = DeviceStatus {
            network_status: network_stream.current(),
            power_status: *power_rx.borrow(),
            audio_status: audio_rx.borrow().clone(),
        };
        let (status_tx, status_rx) = watch::channel(initial);
        let (json_tx, _) = broadcast::channel(config.publishing.broadcast_capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let snapshots_published_total = Arc::new(AtomicU64::new(0));

        let aggregator_task = aggregator::spawn(
            AggregatorDeps {
                network: network_stream,
                power: power_rx,
                audio: audio_rx,
                status_tx,
                json_tx: json_tx.clone(),
                snapshots_published_total: snapshots_published_total.clone(),
                shutdown_rx,
            },
            AggregatorConfig {
                stats_log_interval_secs: config.monitoring.stats_log_interval_secs,
            },
        );

        Ok(Self {
            network,
            power,
            audio,
            status_rx,
            json_tx,
            snapshots_published_total,
            shutdown_tx,
            aggregator_task,
        })
    }

    pub fn network(&self) -> &NetworkStatusMonitor {
        &self.network
    }

    pub fn power(&self) -> &PowerStatusMonitor {
        &self.power
    }

    pub fn audio(&self) -> &AudioStatusMonitor {
        &self.audio
    }

    /// Value-hot stream of typed composite snapshots.
    pub fn subscribe_status(&self) -> watch::Receiver<DeviceStatus> {
        self.status_rx.clone()
    }

    /// Stream of serialized composite snapshots (one JSON string per
    /// aggregation tick; slow consumers may lag).
    pub fn subscribe_json(&self) -> broadcast::Receiver<String> {
        self.json_tx.subscribe()
    }

    pub fn snapshots_published_total(&self) -> u64 {
        self.snapshots_published_total.load(Ordering::Relaxed)
    }

    /// Ordered teardown: aggregator first, then audio tracking (when
    /// running), then the network monitor's forcible unregistration.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        let DeviceMonitor {
            network,
            audio,
            shutdown_tx,
            aggregator_task,
            ..
        } = self;
        let _ = shutdown_tx.send(());
        let _ = aggregator_task.await;
        if audio.is_tracking() {
            audio.stop_tracking()?;
        }
        network.shutdown()?;
        Ok(())
    }
}

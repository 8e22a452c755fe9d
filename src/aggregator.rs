// Combine-latest aggregation worker: one composite snapshot per facet change.
// Snapshots go out typed on a watch cell and serialized on a broadcast channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{broadcast, oneshot, watch};
use tokio::time::{Duration, Instant, interval};

use crate::models::{AudioStatus, DeviceStatus, PowerStatus};
use crate::network_monitor::NetworkStatusStream;

/// Rate limit for the "no receivers" log (avoid a line per snapshot when
/// nobody is listening on the broadcast channel).
const NO_RECEIVERS_WARN_INTERVAL: Duration = Duration::from_secs(60);

/// Facet streams, output channels, and shutdown for the aggregator.
pub struct AggregatorDeps {
    pub network: NetworkStatusStream,
    pub power: watch::Receiver<PowerStatus>,
    pub audio: watch::Receiver<AudioStatus>,
    pub status_tx: watch::Sender<DeviceStatus>,
    pub json_tx: broadcast::Sender<String>,
    pub snapshots_published_total: Arc<AtomicU64>,
    pub shutdown_rx: oneshot::Receiver<()>,
}

pub struct AggregatorConfig {
    /// How often to log aggregator stats (real seconds).
    pub stats_log_interval_secs: u64,
}

/// Spawns the aggregation task. A serialization failure is a programming
/// error: the task logs it at ERROR and exits instead of continuing with a
/// partial composite.
pub fn spawn(deps: AggregatorDeps, config: AggregatorConfig) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = run(deps, config).await {
            tracing::error!(error = %e, "aggregator failed");
        }
    })
}

async fn run(deps: AggregatorDeps, config: AggregatorConfig) -> anyhow::Result<()> {
    let AggregatorDeps {
        mut network,
        mut power,
        mut audio,
        status_tx,
        json_tx,
        snapshots_published_total,
        mut shutdown_rx,
    } = deps;

    let mut stats_tick = interval(Duration::from_secs(config.stats_log_interval_secs));
    stats_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut last_no_receivers_warn: Option<Instant> = None;

    // Combine-latest: every facet cell is value-hot, so all three sources
    // have produced a value by now and the first composite goes out
    // immediately; afterwards any single facet change re-fires.
    publish(
        &network,
        &power,
        &audio,
        &status_tx,
        &json_tx,
        &snapshots_published_total,
        &mut last_no_receivers_warn,
    )?;

    loop {
        tokio::select! {
            changed = network.changed() => {
                changed?;
            }
            changed = power.changed() => {
                changed?;
            }
            changed = audio.changed() => {
                changed?;
            }
            _ = stats_tick.tick() => {
                tracing::info!(
                    snapshots_published_total =
                        snapshots_published_total.load(Ordering::Relaxed),
                    "aggregator stats"
                );
                continue;
            }
            _ = &mut shutdown_rx => {
                tracing::debug!("Aggregator shutting down");
                break;
            }
        }
        publish(
            &network,
            &power,
            &audio,
            &status_tx,
            &json_tx,
            &snapshots_published_total,
            &mut last_no_receivers_warn,
        )?;
    }
    Ok(())
}

/// Builds a fresh composite from the latest value of each facet and publishes
/// it on both output channels.
fn publish(
    network: &NetworkStatusStream,
    power: &watch::Receiver<PowerStatus>,
    audio: &watch::Receiver<AudioStatus>,
    status_tx: &watch::Sender<DeviceStatus>,
    json_tx: &broadcast::Sender<String>,
    snapshots_published_total: &AtomicU64,
    last_no_receivers_warn: &mut Option<Instant>,
) -> anyhow::Result<()> {
    let status = DeviceStatus {
        network_status: network.current(),
        power_status: *power.borrow(),
        audio_status: audio.borrow().clone(),
    };
    let json = status.to_json()?;
    status_tx.send_replace(status);
    if json_tx.send(json).is_err() {
        let should_warn =
            last_no_receivers_warn.is_none_or(|t| t.elapsed() >= NO_RECEIVERS_WARN_INTERVAL);
        if should_warn {
            tracing::debug!(
                operation = "broadcast_snapshot",
                "no snapshot consumers; broadcast channel has no receivers"
            );
            *last_no_receivers_warn = Some(Instant::now());
        }
    }
    snapshots_published_total.fetch_add(1, Ordering::Relaxed);
    Ok(())
}

// Power status monitor: power-save and idle flags

use std::sync::Arc;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::PowerStatus;
use crate::sources::{PowerModeChanged, PowerSource, SourceError};

/// Owns the current [`PowerStatus`] cell. The first sample is taken
/// synchronously in the constructor, so subscribers never observe
/// `PowerStatus::Unknown` from a live monitor. No teardown: the registration
/// lives as long as the process.
pub struct PowerStatusMonitor {
    tx: watch::Sender<PowerStatus>,
    task: JoinHandle<()>,
}

impl PowerStatusMonitor {
    pub fn new(source: Arc<dyn PowerSource>) -> Result<Self, SourceError> {
        let (tx, _rx) = watch::channel(sample(source.as_ref()));
        let events = source.register()?;
        let task = tokio::spawn(pump(source, tx.clone(), events));
        Ok(Self { tx, task })
    }

    /// Value-hot subscription to the status cell.
    pub fn subscribe(&self) -> watch::Receiver<PowerStatus> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> PowerStatus {
        *self.tx.borrow()
    }
}

impl Drop for PowerStatusMonitor {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn sample(source: &dyn PowerSource) -> PowerStatus {
    PowerStatus::Available {
        is_power_save_mode: source.is_power_save_mode(),
        is_device_idle_mode: source.is_device_idle_mode(),
    }
}

/// Re-samples both flags on every power-mode-change notification. No
/// debounce; every notification produces an emission.
async fn pump(
    source: Arc<dyn PowerSource>,
    tx: watch::Sender<PowerStatus>,
    mut events: mpsc::Receiver<PowerModeChanged>,
) {
    while events.recv().await.is_some() {
        let status = sample(source.as_ref());
        tracing::debug!(operation = "power_mode_changed", status = ?status, "re-sampled power status");
        tx.send_replace(status);
    }
}

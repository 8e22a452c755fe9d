// Audio output monitor: which device is currently routing playback

use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::models::AudioStatus;
use crate::sources::{AudioDeviceEvent, AudioDeviceKind, AudioSource, SourceError};

/// Label for unrecognized device categories and for "no active device".
const UNKNOWN_DEVICE: &str = "Unknown";

/// Owns the current [`AudioStatus`] cell. Tracking is an explicit lifecycle:
/// nothing is registered until [`start_tracking`](Self::start_tracking), and
/// the registration is only released by [`stop_tracking`](Self::stop_tracking).
pub struct AudioStatusMonitor {
    source: Arc<dyn AudioSource>,
    tx: watch::Sender<AudioStatus>,
    tracking: Mutex<Option<JoinHandle<()>>>,
}

impl AudioStatusMonitor {
    pub fn new(source: Arc<dyn AudioSource>) -> Self {
        let (tx, _rx) = watch::channel(AudioStatus::Unknown {});
        Self {
            source,
            tx,
            tracking: Mutex::new(None),
        }
    }

    /// Registers the device callback and evaluates the current output once.
    /// Starting an already-tracking monitor is a lifecycle error.
    pub fn start_tracking(&self) -> Result<(), SourceError> {
        let mut tracking = self.tracking.lock().unwrap_or_else(PoisonError::into_inner);
        if tracking.is_some() {
            return Err(SourceError::AlreadyRegistered);
        }
        let events = self.source.register()?;
        evaluate_output(self.source.as_ref(), &self.tx);
        *tracking = Some(tokio::spawn(pump(
            self.source.clone(),
            self.tx.clone(),
            events,
        )));
        Ok(())
    }

    /// Releases the device registration. Stopping a monitor that is not
    /// tracking propagates the platform's `NotRegistered` error.
    pub fn stop_tracking(&self) -> Result<(), SourceError> {
        let task = self
            .tracking
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.source.unregister()?;
        if let Some(task) = task {
            task.abort();
        }
        Ok(())
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Value-hot subscription to the status cell.
    pub fn subscribe(&self) -> watch::Receiver<AudioStatus> {
        self.tx.subscribe()
    }

    pub fn current(&self) -> AudioStatus {
        self.tx.borrow().clone()
    }
}

impl Drop for AudioStatusMonitor {
    fn drop(&mut self) {
        if let Some(task) = self
            .tracking
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

fn device_label(kind: AudioDeviceKind) -> &'static str {
    match kind {
        AudioDeviceKind::BluetoothA2dp => "Bluetooth",
        AudioDeviceKind::WiredHeadphones => "Wired Headphones",
        AudioDeviceKind::BuiltinSpeaker => "Phone Speaker",
        AudioDeviceKind::UsbHeadset => "USB Headset",
        AudioDeviceKind::Other => UNKNOWN_DEVICE,
    }
}

/// Re-scans all known outputs, labels the first one the platform reports
/// active, and pushes the result. Always pushes: identical consecutive
/// evaluations are not suppressed at this layer.
fn evaluate_output(source: &dyn AudioSource, tx: &watch::Sender<AudioStatus>) {
    let devices = source.output_devices();
    let label = devices
        .iter()
        .find(|d| source.is_active(d))
        .map(|d| device_label(d.kind))
        .unwrap_or(UNKNOWN_DEVICE);
    tracing::debug!(operation = "evaluate_output", device = label, "active audio output");
    tx.send_replace(AudioStatus::Available {
        device: label.to_string(),
    });
}

/// Any add or remove, regardless of which device changed, triggers a full
/// re-scan.
async fn pump(
    source: Arc<dyn AudioSource>,
    tx: watch::Sender<AudioStatus>,
    mut events: mpsc::Receiver<AudioDeviceEvent>,
) {
    while let Some(event) = events.recv().await {
        tracing::debug!(operation = "audio_device_event", event = ?event, "device change");
        evaluate_output(source.as_ref(), &tx);
    }
}

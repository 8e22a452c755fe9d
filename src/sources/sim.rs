// In-memory platform: scriptable event sources for the demo binary and tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::models::ConnectionSnapshot;

use super::{
    AirplaneModeSource, AudioDevice, AudioDeviceEvent, AudioDeviceId, AudioDeviceKind, AudioSource,
    ConnectivityEvent, ConnectivitySource, NetworkId, PowerModeChanged, PowerSource, SourceError,
};

const DEFAULT_EVENT_CAPACITY: usize = 32;

/// Scriptable implementation of all four platform contracts. Script methods
/// mutate the simulated host state and deliver the matching events to whichever
/// callbacks are registered. Per-source registration counters expose how often
/// each contract was (re-)registered.
pub struct SimPlatform {
    inner: Mutex<Inner>,
    event_capacity: usize,
    next_id: AtomicU64,
    connectivity_registrations: AtomicU64,
    airplane_registrations: AtomicU64,
    power_registrations: AtomicU64,
    audio_registrations: AtomicU64,
}

struct Inner {
    networks: HashMap<u64, ConnectionSnapshot>,
    active_network: Option<NetworkId>,
    airplane_mode: bool,
    power_save_mode: bool,
    device_idle_mode: bool,
    outputs: Vec<AudioDevice>,
    active_output: Option<AudioDeviceId>,
    connectivity_tx: Option<mpsc::Sender<ConnectivityEvent>>,
    airplane_tx: Option<mpsc::Sender<bool>>,
    power_tx: Option<mpsc::Sender<PowerModeChanged>>,
    audio_tx: Option<mpsc::Sender<AudioDeviceEvent>>,
}

impl Default for SimPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SimPlatform {
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(event_capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                networks: HashMap::new(),
                active_network: None,
                airplane_mode: false,
                power_save_mode: false,
                device_idle_mode: false,
                outputs: Vec::new(),
                active_output: None,
                connectivity_tx: None,
                airplane_tx: None,
                power_tx: None,
                audio_tx: None,
            }),
            event_capacity,
            next_id: AtomicU64::new(1),
            connectivity_registrations: AtomicU64::new(0),
            airplane_registrations: AtomicU64::new(0),
            power_registrations: AtomicU64::new(0),
            audio_registrations: AtomicU64::new(0),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // --- scripting: connectivity ---

    /// Adds a network, makes it the active one, and announces it. Events only
    /// fire for networks matching the registration filter (WiFi or cellular
    /// transport).
    pub fn bring_up(&self, snapshot: ConnectionSnapshot) -> NetworkId {
        let id = NetworkId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tx = {
            let mut inner = self.inner();
            inner.networks.insert(id.0, snapshot);
            inner.active_network = Some(id);
            inner.connectivity_tx.clone()
        };
        if snapshot.using_wifi || snapshot.using_cellular {
            deliver(tx, ConnectivityEvent::Available(id));
        }
        id
    }

    /// Adds and announces a network without changing the active one.
    pub fn announce(&self, snapshot: ConnectionSnapshot) -> NetworkId {
        let id = NetworkId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tx = {
            let mut inner = self.inner();
            inner.networks.insert(id.0, snapshot);
            inner.connectivity_tx.clone()
        };
        if snapshot.using_wifi || snapshot.using_cellular {
            deliver(tx, ConnectivityEvent::Available(id));
        }
        id
    }

    /// Removes a network (clearing the active slot when it matches) and
    /// reports the loss.
    pub fn drop_network(&self, id: NetworkId) {
        let (tx, matched_filter) = {
            let mut inner = self.inner();
            let snapshot = inner.networks.remove(&id.0);
            if inner.active_network == Some(id) {
                inner.active_network = None;
            }
            (
                inner.connectivity_tx.clone(),
                snapshot.is_some_and(|s| s.using_wifi || s.using_cellular),
            )
        };
        if matched_filter {
            deliver(tx, ConnectivityEvent::Lost(id));
        }
    }

    /// Reports that no matching network could be found.
    pub fn report_unavailable(&self) {
        let tx = self.inner().connectivity_tx.clone();
        deliver(tx, ConnectivityEvent::Unavailable);
    }

    pub fn set_airplane_mode(&self, on: bool) {
        let tx = {
            let mut inner = self.inner();
            inner.airplane_mode = on;
            inner.airplane_tx.clone()
        };
        deliver(tx, on);
    }

    // --- scripting: power ---

    pub fn set_power_modes(&self, power_save: bool, device_idle: bool) {
        let tx = {
            let mut inner = self.inner();
            inner.power_save_mode = power_save;
            inner.device_idle_mode = device_idle;
            inner.power_tx.clone()
        };
        deliver(tx, PowerModeChanged);
    }

    // --- scripting: audio ---

    /// Adds an output device and announces it. When `make_active` is set the
    /// device becomes the active output before the event is delivered, so the
    /// re-scan triggered by the event already sees it.
    pub fn attach_output(&self, kind: AudioDeviceKind, make_active: bool) -> AudioDeviceId {
        let id = AudioDeviceId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tx = {
            let mut inner = self.inner();
            inner.outputs.push(AudioDevice { id, kind });
            if make_active {
                inner.active_output = Some(id);
            }
            inner.audio_tx.clone()
        };
        deliver(tx, AudioDeviceEvent::Added(id));
        id
    }

    /// Removes an output device (clearing the active slot when it matches) and
    /// announces the removal.
    pub fn detach_output(&self, id: AudioDeviceId) {
        let tx = {
            let mut inner = self.inner();
            inner.outputs.retain(|d| d.id != id);
            if inner.active_output == Some(id) {
                inner.active_output = None;
            }
            inner.audio_tx.clone()
        };
        deliver(tx, AudioDeviceEvent::Removed(id));
    }

    /// Changes which device the platform reports as active. No event fires;
    /// monitors observe the change on the next add/remove re-scan, matching
    /// how the real platform treats "active" as a query.
    pub fn set_active_output(&self, id: Option<AudioDeviceId>) {
        self.inner().active_output = id;
    }

    // --- registration counters ---

    pub fn connectivity_registrations(&self) -> u64 {
        self.connectivity_registrations.load(Ordering::Relaxed)
    }

    pub fn airplane_registrations(&self) -> u64 {
        self.airplane_registrations.load(Ordering::Relaxed)
    }

    pub fn power_registrations(&self) -> u64 {
        self.power_registrations.load(Ordering::Relaxed)
    }

    pub fn audio_registrations(&self) -> u64 {
        self.audio_registrations.load(Ordering::Relaxed)
    }
}

/// Best-effort event delivery: nothing registered means nothing to notify, and
/// a full channel drops the event with a warning (monitors that fall this far
/// behind re-query on the next event anyway).
fn deliver<T>(tx: Option<mpsc::Sender<T>>, event: T) {
    if let Some(tx) = tx
        && tx.try_send(event).is_err()
    {
        tracing::warn!(
            operation = "deliver_event",
            "sim event channel full or closed; event dropped"
        );
    }
}

impl ConnectivitySource for SimPlatform {
    fn register(&self) -> Result<mpsc::Receiver<ConnectivityEvent>, SourceError> {
        let mut inner = self.inner();
        if inner.connectivity_tx.is_some() {
            return Err(SourceError::AlreadyRegistered);
        }
        let (tx, rx) = mpsc::channel(self.event_capacity);
        inner.connectivity_tx = Some(tx);
        self.connectivity_registrations.fetch_add(1, Ordering::Relaxed);
        Ok(rx)
    }

    fn unregister(&self) -> Result<(), SourceError> {
        self.inner()
            .connectivity_tx
            .take()
            .map(|_| ())
            .ok_or(SourceError::NotRegistered)
    }

    fn active_network(&self) -> Option<NetworkId> {
        self.inner().active_network
    }

    fn capabilities(&self, network: NetworkId) -> Option<ConnectionSnapshot> {
        self.inner().networks.get(&network.0).copied()
    }
}

impl AirplaneModeSource for SimPlatform {
    fn register(&self) -> Result<mpsc::Receiver<bool>, SourceError> {
        let mut inner = self.inner();
        if inner.airplane_tx.is_some() {
            return Err(SourceError::AlreadyRegistered);
        }
        let (tx, rx) = mpsc::channel(self.event_capacity);
        inner.airplane_tx = Some(tx);
        self.airplane_registrations.fetch_add(1, Ordering::Relaxed);
        Ok(rx)
    }

    fn unregister(&self) -> Result<(), SourceError> {
        self.inner()
            .airplane_tx
            .take()
            .map(|_| ())
            .ok_or(SourceError::NotRegistered)
    }

    fn is_airplane_mode_on(&self) -> bool {
        self.inner().airplane_mode
    }
}

impl PowerSource for SimPlatform {
    fn register(&self) -> Result<mpsc::Receiver<PowerModeChanged>, SourceError> {
        let mut inner = self.inner();
        if inner.power_tx.is_some() {
            return Err(SourceError::AlreadyRegistered);
        }
        let (tx, rx) = mpsc::channel(self.event_capacity);
        inner.power_tx = Some(tx);
        self.power_registrations.fetch_add(1, Ordering::Relaxed);
        Ok(rx)
    }

    fn is_power_save_mode(&self) -> bool {
        self.inner().power_save_mode
    }

    fn is_device_idle_mode(&self) -> bool {
        self.inner().device_idle_mode
    }
}

impl AudioSource for SimPlatform {
    fn register(&self) -> Result<mpsc::Receiver<AudioDeviceEvent>, SourceError> {
        let mut inner = self.inner();
        if inner.audio_tx.is_some() {
            return Err(SourceError::AlreadyRegistered);
        }
        let (tx, rx) = mpsc::channel(self.event_capacity);
        inner.audio_tx = Some(tx);
        self.audio_registrations.fetch_add(1, Ordering::Relaxed);
        Ok(rx)
    }

    fn unregister(&self) -> Result<(), SourceError> {
        self.inner()
            .audio_tx
            .take()
            .map(|_| ())
            .ok_or(SourceError::NotRegistered)
    }

    fn output_devices(&self) -> Vec<AudioDevice> {
        self.inner().outputs.clone()
    }

    fn is_active(&self, device: &AudioDevice) -> bool {
        self.inner().active_output == Some(device.id)
    }
}

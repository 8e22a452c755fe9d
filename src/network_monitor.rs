// Network status monitor: connectivity + airplane-mode events fused into one
// debounced, value-hot status stream. Single writer: all emissions originate
// from monitor-owned tasks.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{Notify, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep, timeout};

use crate::models::{ConnectionSnapshot, NetworkStatus};
use crate::sources::{AirplaneModeSource, ConnectivityEvent, ConnectivitySource, SourceError};

/// Quiet window applied to raw status emissions; a burst shorter than this
/// collapses to its final value.
pub const DEBOUNCE_WINDOW: Duration = Duration::from_secs(1);

/// How long upstream registrations stay alive after the last subscriber
/// leaves, so a fast resubscribe avoids the re-registration cost.
pub const RESUBSCRIBE_GRACE: Duration = Duration::from_secs(5);

struct Shared {
    connectivity: Arc<dyn ConnectivitySource>,
    airplane: Arc<dyn AirplaneModeSource>,
    raw_tx: watch::Sender<NetworkStatus>,
    /// Epoch-ms timestamp of the previous debounced emission. Every raw status
    /// is stamped with this value, then the debounce task advances it after
    /// each forward, so published statuses report the prior state's dwell time.
    since: AtomicU64,
    subscribers: AtomicUsize,
    subscribers_changed: Notify,
    pump: Mutex<PumpState>,
}

struct PumpState {
    registered: bool,
    task: Option<JoinHandle<()>>,
}

/// Owns the current [`NetworkStatus`] cell. Constructed once per process by
/// the device monitor registry; requires a running tokio runtime.
pub struct NetworkStatusMonitor {
    shared: Arc<Shared>,
    public_rx: watch::Receiver<NetworkStatus>,
    debounce_task: JoinHandle<()>,
    lifecycle_task: JoinHandle<()>,
}

/// Value-hot subscription to the debounced status stream. Holding one keeps
/// the monitor's upstream registrations alive (plus the grace window after the
/// last one drops).
pub struct NetworkStatusStream {
    rx: watch::Receiver<NetworkStatus>,
    _guard: SubscriberGuard,
}

impl NetworkStatusStream {
    /// Latest debounced status.
    pub fn current(&self) -> NetworkStatus {
        self.rx.borrow().clone()
    }

    /// Waits for the next debounced emission and returns it.
    pub async fn changed(&mut self) -> Result<NetworkStatus, watch::error::RecvError> {
        self.rx.changed().await?;
        Ok(self.rx.borrow_and_update().clone())
    }
}

struct SubscriberGuard {
    shared: Arc<Shared>,
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        self.shared.subscribers.fetch_sub(1, Ordering::AcqRel);
        self.shared.subscribers_changed.notify_one();
    }
}

impl NetworkStatusMonitor {
    /// Reads the current airplane-mode flag, registers both upstream
    /// callbacks, emits the current connectivity state, and starts the
    /// debounce and lifecycle tasks.
    pub fn new(
        connectivity: Arc<dyn ConnectivitySource>,
        airplane: Arc<dyn AirplaneModeSource>,
    ) -> Result<Self, SourceError> {
        let airplane_on = airplane.is_airplane_mode_on();
        let initial = NetworkStatus::Unknown {
            since: 0,
            is_in_airplane_mode: airplane_on,
        };
        let (raw_tx, raw_rx) = watch::channel(initial.clone());
        let (public_tx, public_rx) = watch::channel(initial);

        let shared = Arc::new(Shared {
            connectivity,
            airplane,
            raw_tx,
            since: AtomicU64::new(0),
            subscribers: AtomicUsize::new(0),
            subscribers_changed: Notify::new(),
            pump: Mutex::new(PumpState {
                registered: false,
                task: None,
            }),
        });

        register_upstream(&shared)?;

        let debounce_task = tokio::spawn(debounce_loop(raw_rx, public_tx, shared.clone()));
        let lifecycle_task = tokio::spawn(lifecycle_loop(shared.clone()));

        Ok(Self {
            shared,
            public_rx,
            debounce_task,
            lifecycle_task,
        })
    }

    /// Subscribes to the debounced status stream. The new stream immediately
    /// holds the latest value. Subscribing after a grace-period release
    /// re-registers the upstream callbacks.
    pub fn subscribe(&self) -> NetworkStatusStream {
        self.shared.subscribers.fetch_add(1, Ordering::AcqRel);
        self.shared.subscribers_changed.notify_one();
        NetworkStatusStream {
            rx: self.public_rx.clone(),
            _guard: SubscriberGuard {
                shared: self.shared.clone(),
            },
        }
    }

    /// Latest debounced status without subscribing.
    pub fn current(&self) -> NetworkStatus {
        self.public_rx.borrow().clone()
    }

    /// Forcibly unregisters both upstream callbacks, even while subscribers
    /// remain; callers synchronize shutdown with subscriber lifetime
    /// themselves. Not idempotent: a second call propagates the platform's
    /// `NotRegistered` error.
    pub fn shutdown(&self) -> Result<(), SourceError> {
        self.lifecycle_task.abort();
        release_upstream(&self.shared)
    }
}

impl Drop for NetworkStatusMonitor {
    fn drop(&mut self) {
        self.lifecycle_task.abort();
        self.debounce_task.abort();
        let mut pump = lock(&self.shared.pump);
        if let Some(task) = pump.task.take() {
            task.abort();
        }
    }
}

fn lock(pump: &Mutex<PumpState>) -> MutexGuard<'_, PumpState> {
    pump.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registers both upstream callbacks and starts the event pump. On a partial
/// failure the half-made registration is rolled back before the error
/// propagates.
fn register_upstream(shared: &Arc<Shared>) -> Result<(), SourceError> {
    let connectivity_rx = shared.connectivity.register()?;
    let airplane_rx = match shared.airplane.register() {
        Ok(rx) => rx,
        Err(e) => {
            let _ = shared.connectivity.unregister();
            return Err(e);
        }
    };
    let airplane_on = shared.airplane.is_airplane_mode_on();
    emit_current(shared, airplane_on);
    let task = tokio::spawn(event_pump(
        shared.clone(),
        connectivity_rx,
        airplane_rx,
        airplane_on,
    ));
    let mut pump = lock(&shared.pump);
    pump.registered = true;
    pump.task = Some(task);
    tracing::debug!(operation = "register_upstream", "network callbacks registered");
    Ok(())
}

/// Stops the event pump and unregisters both upstream callbacks. Lifecycle
/// errors from the platform propagate unchanged.
fn release_upstream(shared: &Shared) -> Result<(), SourceError> {
    {
        let mut pump = lock(&shared.pump);
        if let Some(task) = pump.task.take() {
            task.abort();
        }
        pump.registered = false;
    }
    shared.connectivity.unregister()?;
    shared.airplane.unregister()?;
    tracing::debug!(operation = "release_upstream", "network callbacks unregistered");
    Ok(())
}

/// Evaluates current connectivity via the platform queries and pushes it to
/// the raw cell: an active network yields `Connected` (with no "available"
/// snapshot, since no availability event carried one), otherwise
/// `Disconnected`.
fn emit_current(shared: &Shared, airplane_on: bool) {
    let since = shared.since.load(Ordering::Relaxed);
    let status = match shared.connectivity.active_network() {
        Some(id) => NetworkStatus::Connected {
            available_connection_status: None,
            active_connection_status: shared.connectivity.capabilities(id),
            since,
            is_in_airplane_mode: airplane_on,
        },
        None => NetworkStatus::Disconnected {
            active_connection_status: None,
            since,
            is_in_airplane_mode: airplane_on,
        },
    };
    shared.raw_tx.send_replace(status);
}

fn active_snapshot(shared: &Shared) -> Option<ConnectionSnapshot> {
    shared
        .connectivity
        .active_network()
        .and_then(|id| shared.connectivity.capabilities(id))
}

/// Translates platform events into raw status emissions. Runs until either
/// upstream channel closes or the task is aborted by a release.
async fn event_pump(
    shared: Arc<Shared>,
    mut connectivity_rx: mpsc::Receiver<ConnectivityEvent>,
    mut airplane_rx: mpsc::Receiver<bool>,
    mut airplane_on: bool,
) {
    loop {
        tokio::select! {
            event = connectivity_rx.recv() => match event {
                Some(ConnectivityEvent::Available(network)) => {
                    tracing::debug!(operation = "connectivity_event", network = network.0, "network available");
                    let status = NetworkStatus::Connected {
                        available_connection_status: shared.connectivity.capabilities(network),
                        active_connection_status: active_snapshot(&shared),
                        since: shared.since.load(Ordering::Relaxed),
                        is_in_airplane_mode: airplane_on,
                    };
                    shared.raw_tx.send_replace(status);
                }
                Some(ConnectivityEvent::Lost(network)) => {
                    tracing::debug!(operation = "connectivity_event", network = network.0, "network lost");
                    let status = NetworkStatus::Disconnected {
                        active_connection_status: active_snapshot(&shared),
                        since: shared.since.load(Ordering::Relaxed),
                        is_in_airplane_mode: airplane_on,
                    };
                    shared.raw_tx.send_replace(status);
                }
                Some(ConnectivityEvent::Unavailable) => {
                    tracing::debug!(operation = "connectivity_event", "network unavailable");
                    let status = NetworkStatus::Disconnected {
                        active_connection_status: active_snapshot(&shared),
                        since: shared.since.load(Ordering::Relaxed),
                        is_in_airplane_mode: airplane_on,
                    };
                    shared.raw_tx.send_replace(status);
                }
                None => break,
            },
            flag = airplane_rx.recv() => match flag {
                Some(on) => {
                    tracing::debug!(operation = "airplane_mode", enabled = on, "airplane mode toggled");
                    airplane_on = on;
                    emit_current(&shared, airplane_on);
                }
                None => break,
            },
        }
    }
}

/// Forwards raw emissions to the public cell once the raw side has been quiet
/// for [`DEBOUNCE_WINDOW`], then stamps the shared `since` cell. The stamp
/// lands after the outgoing value was built, so the forwarded status carries
/// the previous emission's time.
async fn debounce_loop(
    mut raw_rx: watch::Receiver<NetworkStatus>,
    public_tx: watch::Sender<NetworkStatus>,
    shared: Arc<Shared>,
) {
    loop {
        if raw_rx.changed().await.is_err() {
            break;
        }
        let mut latest = raw_rx.borrow_and_update().clone();
        loop {
            match timeout(DEBOUNCE_WINDOW, raw_rx.changed()).await {
                Ok(Ok(())) => latest = raw_rx.borrow_and_update().clone(),
                Ok(Err(_)) => break,
                Err(_) => break,
            }
        }
        shared.since.store(epoch_millis(), Ordering::Relaxed);
        tracing::debug!(
            operation = "forward_status",
            status = latest.status_name(),
            "debounced network status"
        );
        public_tx.send_replace(latest);
    }
}

/// Releases the upstream registrations once the subscriber count has sat at
/// zero for [`RESUBSCRIBE_GRACE`], and re-registers when a subscriber arrives
/// after a release. The construction-time registration is only given up after
/// an actual last-unsubscribe, never for a monitor that has not been
/// subscribed yet.
async fn lifecycle_loop(shared: Arc<Shared>) {
    loop {
        shared.subscribers_changed.notified().await;
        let count = shared.subscribers.load(Ordering::Acquire);
        let registered = lock(&shared.pump).registered;
        if count == 0 && registered {
            if wait_out_grace(&shared).await {
                if let Err(e) = release_upstream(&shared) {
                    tracing::error!(error = %e, operation = "release_upstream", "failed to release network callbacks");
                    break;
                }
            }
        } else if count > 0 && !registered {
            if let Err(e) = register_upstream(&shared) {
                tracing::error!(error = %e, operation = "register_upstream", "failed to re-register network callbacks");
                break;
            }
        }
    }
}

/// Waits out the resubscribe grace window. Returns true when the window
/// elapsed with no subscriber, false when someone resubscribed in time.
async fn wait_out_grace(shared: &Shared) -> bool {
    let deadline = sleep(RESUBSCRIBE_GRACE);
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => {
                return shared.subscribers.load(Ordering::Acquire) == 0;
            }
            _ = shared.subscribers_changed.notified() => {
                if shared.subscribers.load(Ordering::Acquire) > 0 {
                    return false;
                }
            }
        }
    }
}

fn epoch_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, operation = "get_timestamp", "system time error");
            0
        })
}

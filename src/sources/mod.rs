// Platform event-source contracts (connectivity, airplane mode, power, audio)

pub mod sim;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::models::ConnectionSnapshot;

/// Lifecycle misuse at a platform source. Both cases are programming errors:
/// callers propagate them instead of retrying.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("a callback is already registered with this source")]
    AlreadyRegistered,
    #[error("no callback is registered with this source")]
    NotRegistered,
}

/// Opaque handle to one network known to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    /// A network satisfying the registration filter became available.
    Available(NetworkId),
    /// A previously available network went away.
    Lost(NetworkId),
    /// The platform gave up finding a matching network.
    Unavailable,
}

/// Connectivity-change notifier plus capability queries. Registration is
/// filtered to internet-capable, WiFi-or-cellular-transport networks.
pub trait ConnectivitySource: Send + Sync + 'static {
    /// Registers the monitor's callback; events arrive on the returned channel.
    /// Registering twice without an unregister in between is an error.
    fn register(&self) -> Result<mpsc::Receiver<ConnectivityEvent>, SourceError>;

    /// Releases the registration. Fails loudly when nothing is registered.
    fn unregister(&self) -> Result<(), SourceError>;

    /// The host's currently active network, if any.
    fn active_network(&self) -> Option<NetworkId>;

    /// Transport/validation snapshot of the given network. `None` when the
    /// network can no longer be inspected.
    fn capabilities(&self, network: NetworkId) -> Option<ConnectionSnapshot>;
}

/// System-setting notifier and query for the airplane-mode flag.
pub trait AirplaneModeSource: Send + Sync + 'static {
    fn register(&self) -> Result<mpsc::Receiver<bool>, SourceError>;
    fn unregister(&self) -> Result<(), SourceError>;
    fn is_airplane_mode_on(&self) -> bool;
}

/// Power-mode-change notification. Carries no payload; receivers re-query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerModeChanged;

/// Power-mode notifier plus synchronous flag queries. The power monitor never
/// tears down, so the contract has no unregister.
pub trait PowerSource: Send + Sync + 'static {
    fn register(&self) -> Result<mpsc::Receiver<PowerModeChanged>, SourceError>;
    fn is_power_save_mode(&self) -> bool;
    fn is_device_idle_mode(&self) -> bool;
}

/// Opaque handle to one audio output device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AudioDeviceId(pub u64);

/// Platform-reported category of an output device. `Other` covers every
/// category the monitor has no label for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioDeviceKind {
    BluetoothA2dp,
    WiredHeadphones,
    BuiltinSpeaker,
    UsbHeadset,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioDevice {
    pub id: AudioDeviceId,
    pub kind: AudioDeviceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioDeviceEvent {
    Added(AudioDeviceId),
    Removed(AudioDeviceId),
}

/// Audio-device notifier plus synchronous output queries.
pub trait AudioSource: Send + Sync + 'static {
    fn register(&self) -> Result<mpsc::Receiver<AudioDeviceEvent>, SourceError>;
    fn unregister(&self) -> Result<(), SourceError>;

    /// All output devices currently known to the platform.
    fn output_devices(&self) -> Vec<AudioDevice>;

    /// Whether the platform reports this device as actively routing playback.
    fn is_active(&self, device: &AudioDevice) -> bool;
}

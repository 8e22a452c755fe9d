// Status variants and the composite device snapshot

mod audio;
mod connection;
mod device;
mod network;
mod power;

pub use audio::AudioStatus;
pub use connection::ConnectionSnapshot;
pub use device::DeviceStatus;
pub use network::NetworkStatus;
pub use power::PowerStatus;

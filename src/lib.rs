// Library for consumers and tests to access modules

pub mod aggregator;
pub mod audio_monitor;
pub mod config;
pub mod device_monitor;
pub mod models;
pub mod network_monitor;
pub mod power_monitor;
pub mod sources;

// Shared test helpers

use std::sync::Arc;

use devicemonitor::config::AppConfig;
use devicemonitor::device_monitor::DeviceMonitorSources;
use devicemonitor::models::ConnectionSnapshot;
use devicemonitor::sources::sim::SimPlatform;

const TEST_CONFIG: &str = r#"
[publishing]
broadcast_capacity = 16

[monitoring]
event_channel_capacity = 16
stats_log_interval_secs = 3600

[demo]
step_interval_ms = 100
"#;

#[allow(dead_code)]
pub fn test_config() -> AppConfig {
    AppConfig::load_from_str(TEST_CONFIG).expect("test config")
}

pub fn test_platform() -> Arc<SimPlatform> {
    Arc::new(SimPlatform::new())
}

/// All four source contracts backed by the same sim platform.
#[allow(dead_code)]
pub fn platform_sources(platform: &Arc<SimPlatform>) -> DeviceMonitorSources {
    DeviceMonitorSources {
        connectivity: platform.clone(),
        airplane: platform.clone(),
        power: platform.clone(),
        audio: platform.clone(),
    }
}

#[allow(dead_code)]
pub fn wifi_connection() -> ConnectionSnapshot {
    ConnectionSnapshot {
        using_wifi: true,
        using_cellular: false,
        using_vpn: false,
        is_validated: true,
        is_behind_captive_portal: false,
        is_not_metered: true,
    }
}

#[allow(dead_code)]
pub fn cellular_connection() -> ConnectionSnapshot {
    ConnectionSnapshot {
        using_wifi: false,
        using_cellular: true,
        using_vpn: false,
        is_validated: false,
        is_behind_captive_portal: false,
        is_not_metered: false,
    }
}

// Composite device snapshot and its wire encoding

use serde::Serialize;

use super::{AudioStatus, NetworkStatus, PowerStatus};

/// One consistent snapshot of all monitored facets. Built fresh on every
/// aggregation tick, never mutated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceStatus {
    pub network_status: NetworkStatus,
    pub power_status: PowerStatus,
    pub audio_status: AudioStatus,
}

impl DeviceStatus {
    /// Serializes to the flat wire format: fixed top-level keys, nested objects
    /// carrying only the variant payload fields (no type discriminator).
    /// Failure here is a programming error; callers treat it as fatal.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

// Transport/validation attributes of one network connection

use serde::{Deserialize, Serialize};

/// Immutable record of a single connection's transport and validation flags,
/// captured at event time. Absent (`None` at the use sites) when no active
/// connection can be inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionSnapshot {
    #[serde(rename = "usingWiFi")]
    pub using_wifi: bool,
    pub using_cellular: bool,
    #[serde(rename = "usingVPN")]
    pub using_vpn: bool,
    pub is_validated: bool,
    pub is_behind_captive_portal: bool,
    pub is_not_metered: bool,
}

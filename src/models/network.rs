// Network status variants

use serde::Serialize;

use super::ConnectionSnapshot;

/// Current network reachability. `since` carries the epoch-ms timestamp of the
/// previous debounced emission from the owning monitor (how long the prior
/// state was held), and is monotonically non-decreasing per monitor instance.
///
/// Encodes without a discriminator: only the active variant's payload fields
/// appear on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum NetworkStatus {
    /// Initial state before the first observation.
    Unknown { since: u64, is_in_airplane_mode: bool },
    Connected {
        available_connection_status: Option<ConnectionSnapshot>,
        active_connection_status: Option<ConnectionSnapshot>,
        since: u64,
        is_in_airplane_mode: bool,
    },
    Disconnected {
        active_connection_status: Option<ConnectionSnapshot>,
        since: u64,
        is_in_airplane_mode: bool,
    },
}

impl NetworkStatus {
    /// Human-readable variant name, for logs.
    pub fn status_name(&self) -> &'static str {
        match self {
            NetworkStatus::Unknown { .. } => "Unknown",
            NetworkStatus::Connected { .. } => "Connected",
            NetworkStatus::Disconnected { .. } => "Disconnected",
        }
    }

    pub fn since(&self) -> u64 {
        match self {
            NetworkStatus::Unknown { since, .. }
            | NetworkStatus::Connected { since, .. }
            | NetworkStatus::Disconnected { since, .. } => *since,
        }
    }

    pub fn is_in_airplane_mode(&self) -> bool {
        match self {
            NetworkStatus::Unknown {
                is_in_airplane_mode, ..
            }
            | NetworkStatus::Connected {
                is_in_airplane_mode, ..
            }
            | NetworkStatus::Disconnected {
                is_in_airplane_mode, ..
            } => *is_in_airplane_mode,
        }
    }
}

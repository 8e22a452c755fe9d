// Power status variants

use serde::Serialize;

/// Power-saving and idle flags. `Unknown` means no reading has been taken yet;
/// the power monitor samples synchronously at construction, so subscribers of a
/// live monitor never observe it. Encodes without a discriminator (`Unknown`
/// becomes an empty object).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum PowerStatus {
    Unknown {},
    Available {
        is_power_save_mode: bool,
        is_device_idle_mode: bool,
    },
}

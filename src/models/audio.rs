// Audio output status variants

use serde::Serialize;

/// Currently active audio output. `device` is one of the fixed labels produced
/// by the audio monitor ("Bluetooth", "Wired Headphones", "Phone Speaker",
/// "USB Headset", "Unknown"). Encodes without a discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum AudioStatus {
    Unknown {},
    Available { device: String },
}

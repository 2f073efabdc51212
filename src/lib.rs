//! `ibs-th1-listener` library.
//!
//! Decodes the proprietary BLE advertisement frames of the Inkbird IBS-TH1
//! temperature/humidity sensor and exposes a subscribe/unsubscribe interface
//! over the stream of decoded readings.
//!
//! The binary (`src/main.rs`) is responsible for CLI parsing and process exit
//! codes. The core business logic lives in [`crate::app`] where it can be
//! tested deterministically with an injected scanner and injected output
//! streams; the protocol logic itself is in [`crate::frame`] and
//! [`crate::subscription`].

pub mod alias;
pub mod app;
pub mod device_id;
pub mod frame;
pub mod output;
pub mod reading;
pub mod scanner;
pub mod subscription;
pub mod throttle;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types at the crate root
pub use alias::{Alias, AliasMap, parse_alias, resolve_name, to_map};
pub use device_id::DeviceId;
pub use frame::{DecodeError, DecodedFields, FRAME_LEN, ProbeType, crc16_arc, decode};
pub use output::OutputFormatter;
pub use output::influxdb::InfluxDbFormatter;
pub use reading::Reading;
pub use scanner::{DEVICE_NAME, RawAdvertisement, ScanError, ScanFilter, Scanner};
pub use subscription::{ReadingSubscription, SubscriptionState};
pub use throttle::{Throttle, parse_duration};

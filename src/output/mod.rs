//! Output formatters for sensor readings.
//!
//! A trait for turning a successful [`Reading`] into one output line, with an
//! InfluxDB line protocol implementation. Error readings never reach a
//! formatter; the run loop reports them separately.

pub mod influxdb;

use crate::reading::Reading;

/// Formats successful readings into output strings.
pub trait OutputFormatter: Send + Sync {
    /// Format a reading under the given display name (alias or device id).
    fn format(&self, reading: &Reading, name: &str) -> String;
}

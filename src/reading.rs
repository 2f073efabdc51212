//! Decoded sensor reading delivered to the subscriber.

use crate::device_id::DeviceId;
use crate::frame::{DecodeError, DecodedFields, ProbeType};
use std::time::SystemTime;

/// One decode attempt for one advertisement, success or failure.
///
/// A reading is all-or-nothing: either every measurement field is populated
/// and `error` is `None`, or `error` is set and every measurement field is
/// absent. The two constructors are the only way a reading is built, so no
/// partially-populated value can reach the subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    /// Identifier of the originating device, as reported by the scanner.
    pub device_id: DeviceId,
    /// Capture time, set when the frame was decoded.
    pub timestamp: SystemTime,
    /// Temperature in Celsius, 2 fractional decimal digits.
    pub temperature: Option<f64>,
    /// Relative humidity in percent (0-100), 2 fractional decimal digits.
    pub humidity: Option<f64>,
    /// Source of the temperature measurement.
    pub probe_type: ProbeType,
    /// Raw battery level byte, 0-255.
    pub battery: Option<u8>,
    /// Set only when the frame failed checksum verification.
    pub error: Option<DecodeError>,
}

impl Reading {
    /// Build a successful reading from decoded frame fields.
    pub fn decoded(device_id: DeviceId, fields: DecodedFields) -> Self {
        Reading {
            device_id,
            timestamp: SystemTime::now(),
            temperature: Some(fields.temperature_celsius),
            humidity: Some(fields.humidity_percent),
            probe_type: fields.probe_type,
            battery: Some(fields.battery_percent),
            error: None,
        }
    }

    /// Build an error reading for a frame that failed checksum verification.
    pub fn checksum_failure(device_id: DeviceId, error: DecodeError) -> Self {
        Reading {
            device_id,
            timestamp: SystemTime::now(),
            temperature: None,
            humidity: None,
            probe_type: ProbeType::Unknown,
            battery: None,
            error: Some(error),
        }
    }

    /// Whether this reading carries measurements rather than an error.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

//! Frame decoding for the IBS-TH1 advertisement payload.
//!
//! The sensor broadcasts a fixed 9-byte manufacturer-data frame:
//!
//! ```text
//! offset  0..2   temperature, little-endian, signed, centidegrees
//! offset  2..4   humidity, little-endian, unsigned, centipercent
//! offset  4      probe type (0 = built-in, 1 = external)
//! offset  5..7   CRC-16/ARC over bytes 0..5, little-endian
//! offset  7      battery level, raw byte
//! offset  8      production test data, ignored
//! ```
//!
//! Decoding is a pure function with no shared state and is safe to call
//! concurrently.

use thiserror::Error;

/// Exact length of a valid IBS-TH1 manufacturer-data frame.
pub const FRAME_LEN: usize = 9;

/// Number of leading bytes covered by the embedded checksum.
const CRC_COVERED_LEN: usize = 5;

/// Errors for frames that fail validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload is not exactly [`FRAME_LEN`] bytes. Never surfaced to the
    /// consumer; the subscription drops these events before decoding.
    #[error("malformed frame: expected {FRAME_LEN} bytes, got {actual}")]
    MalformedLength { actual: usize },
    /// Embedded checksum does not match the CRC-16/ARC of bytes 0..5.
    /// Surfaced to the consumer as an error reading.
    #[error("checksum mismatch: frame carries {expected:#06x}, computed {computed:#06x}")]
    ChecksumMismatch { expected: u16, computed: u16 },
}

/// Temperature source reported in byte 4 of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProbeType {
    /// Unrecognized probe byte. A valid value, not a decode failure.
    #[default]
    Unknown,
    /// On-board sensor (probe byte 0).
    BuiltIn,
    /// External wired probe (probe byte 1).
    External,
}

impl std::fmt::Display for ProbeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeType::Unknown => write!(f, "unknown"),
            ProbeType::BuiltIn => write!(f, "built-in"),
            ProbeType::External => write!(f, "external"),
        }
    }
}

impl From<u8> for ProbeType {
    fn from(byte: u8) -> Self {
        match byte {
            0 => ProbeType::BuiltIn,
            1 => ProbeType::External,
            _ => ProbeType::Unknown,
        }
    }
}

/// Measurement fields extracted from a checksum-valid frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecodedFields {
    /// Temperature in Celsius, 2 fractional decimal digits.
    pub temperature_celsius: f64,
    /// Relative humidity in percent, 2 fractional decimal digits.
    pub humidity_percent: f64,
    /// Source of the temperature measurement.
    pub probe_type: ProbeType,
    /// Raw battery level byte, 0-255.
    pub battery_percent: u8,
}

/// CRC-16/ARC: polynomial 0xA001 (reflected 0x8005), initial value 0xFFFF,
/// bits processed LSB first, no final XOR.
pub fn crc16_arc(data: &[u8]) -> u16 {
    let mut crc: u16 = 0xFFFF;
    for &byte in data {
        crc ^= u16::from(byte);
        for _ in 0..8 {
            let lsb_set = crc & 0x0001 != 0;
            crc >>= 1;
            if lsb_set {
                crc ^= 0xA001;
            }
        }
    }
    crc
}

/// Decode a candidate manufacturer-data payload into measurement fields.
///
/// Validates the length and embedded checksum before extracting any field.
/// Total: every input yields `Ok` or a [`DecodeError`], never a panic.
pub fn decode(payload: &[u8]) -> Result<DecodedFields, DecodeError> {
    if payload.len() != FRAME_LEN {
        return Err(DecodeError::MalformedLength {
            actual: payload.len(),
        });
    }

    let expected = u16::from_le_bytes([payload[5], payload[6]]);
    let computed = crc16_arc(&payload[..CRC_COVERED_LEN]);
    if expected != computed {
        return Err(DecodeError::ChecksumMismatch { expected, computed });
    }

    // Sign-magnitude reconstruction stays in integer arithmetic; the
    // fixed-point scale is applied last.
    let temperature_raw = u16::from_le_bytes([payload[0], payload[1]]);
    let temperature_centi: i32 = if temperature_raw >= 0x8000 {
        i32::from(temperature_raw) - 0x1_0000
    } else {
        i32::from(temperature_raw)
    };

    let humidity_raw = u16::from_le_bytes([payload[2], payload[3]]);

    Ok(DecodedFields {
        temperature_celsius: f64::from(temperature_centi) / 100.0,
        humidity_percent: f64::from(humidity_raw) / 100.0,
        probe_type: ProbeType::from(payload[4]),
        battery_percent: payload[7],
    })
}

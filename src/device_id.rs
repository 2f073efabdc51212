//! Stable identifier for a sensor device.
//!
//! The scanning backend reports each device by its 6-byte Bluetooth address.
//! The core treats the value as opaque; it only needs equality, hashing and a
//! printable form.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Opaque, stable identifier of a physical sensor (a Bluetooth address).
///
/// Compact enough to copy freely and to key the throttle and alias maps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceId([u8; 6]);

impl DeviceId {
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    pub const fn bytes(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

/// Errors returned when parsing a device id from its colon-separated form.
#[derive(Error, Debug, PartialEq)]
pub enum ParseDeviceIdError {
    #[error("invalid device id '{0}': expected AA:BB:CC:DD:EE:FF")]
    InvalidFormat(String),
    #[error("invalid device id: '{0}' is not a hex octet")]
    InvalidOctet(String),
}

impl FromStr for DeviceId {
    type Err = ParseDeviceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut parts = s.split(':');
        for slot in &mut bytes {
            let part = parts
                .next()
                .ok_or_else(|| ParseDeviceIdError::InvalidFormat(s.to_string()))?;
            if part.len() != 2 {
                return Err(ParseDeviceIdError::InvalidOctet(part.to_string()));
            }
            *slot = u8::from_str_radix(part, 16)
                .map_err(|_| ParseDeviceIdError::InvalidOctet(part.to_string()))?;
        }
        if parts.next().is_some() {
            return Err(ParseDeviceIdError::InvalidFormat(s.to_string()));
        }
        Ok(DeviceId(bytes))
    }
}

impl From<[u8; 6]> for DeviceId {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

#[cfg(feature = "bluer")]
impl From<bluer::Address> for DeviceId {
    fn from(addr: bluer::Address) -> Self {
        Self(addr.0)
    }
}

#[cfg(feature = "bluer")]
impl From<DeviceId> for bluer::Address {
    fn from(id: DeviceId) -> Self {
        bluer::Address(id.0)
    }
}

//! BLE scanning collaborator seam.
//!
//! The core never touches the radio directly. It talks to a [`Scanner`], an
//! opaque event source that signals readiness once and then delivers raw
//! advertisements for every nearby device. The live BlueZ-backed
//! implementation lives in [`bluer`]; tests use in-memory fakes.

#[cfg(feature = "bluer")]
pub mod bluer;

use crate::device_id::DeviceId;
use thiserror::Error;

/// Advertised local name shared by the IBS-TH1 and IBS-TH1 mini.
pub const DEVICE_NAME: &str = "sps";

/// 16-bit service id the sensor advertises, used to pre-filter the scan.
pub const SERVICE_UUID: &str = "fff0";

/// One raw advertisement event as reported by the radio.
///
/// External input, not owned by the core: the name and payload are whatever
/// the device broadcast, including nothing at all.
#[derive(Debug, Clone, PartialEq)]
pub struct RawAdvertisement {
    pub device_id: DeviceId,
    pub local_name: Option<String>,
    pub manufacturer_data: Option<Vec<u8>>,
}

/// Scan parameters handed to [`Scanner::start_scanning`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanFilter {
    /// Advertised service id to pre-filter on at the radio level.
    pub service_uuid: &'static str,
    /// Whether repeat advertisements from the same device are delivered.
    pub allow_duplicates: bool,
}

impl Default for ScanFilter {
    fn default() -> Self {
        ScanFilter {
            service_uuid: SERVICE_UUID,
            allow_duplicates: true,
        }
    }
}

/// Callback receiving every raw advertisement the radio picks up.
pub type AdvertisementHandler = Box<dyn Fn(RawAdvertisement) + Send + Sync + 'static>;

/// Abstraction over the scanning collaborator.
///
/// Implementations deliver all advertisements on a single logical context;
/// the subscription layer does the device filtering and decoding.
pub trait Scanner: Send + Sync {
    /// Whether the radio is powered and ready to scan.
    fn is_ready(&self) -> bool;

    /// Register a one-shot notification fired when the radio becomes ready.
    fn on_ready(&self, notify: Box<dyn FnOnce() + Send + 'static>);

    /// Begin scanning, delivering every advertisement event to `handler`.
    fn start_scanning(&self, filter: &ScanFilter, handler: AdvertisementHandler);

    /// Stop scanning. Events already in flight may still reach the handler.
    fn stop_scanning(&self);
}

/// Error type for scanner construction and radio access.
#[derive(Error, Debug)]
pub enum ScanError {
    /// Bluetooth/adapter related error
    #[error("Bluetooth error: {0}")]
    Bluetooth(String),
}

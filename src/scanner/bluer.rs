//! BlueZ D-Bus scanning backend.
//!
//! This backend uses the `bluer` crate to communicate with the BlueZ daemon
//! via D-Bus. It requires the `bluetoothd` daemon to be running.

use super::{AdvertisementHandler, RawAdvertisement, ScanError, ScanFilter, Scanner};
use crate::device_id::DeviceId;
use bluer::{
    Adapter, AdapterEvent, DeviceEvent, DeviceProperty, DiscoveryFilter, DiscoveryTransport,
    Session, Uuid,
};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::{JoinHandle, JoinSet};

/// Bluetooth base UUID used to expand 16-bit service ids.
const BLUETOOTH_BASE_UUID: u128 = 0x00000000_0000_1000_8000_00805f9b34fb;

impl From<bluer::Error> for ScanError {
    fn from(err: bluer::Error) -> Self {
        ScanError::Bluetooth(err.to_string())
    }
}

/// Live [`Scanner`] backed by the default BlueZ adapter.
///
/// Must be constructed inside a tokio runtime; the synchronous trait methods
/// spawn their radio work onto that runtime.
pub struct BluerScanner {
    // Holding the session keeps the D-Bus connection alive.
    _session: Session,
    adapter: Adapter,
    runtime: Handle,
    powered: Arc<AtomicBool>,
    scan_task: Mutex<Option<JoinHandle<()>>>,
}

impl BluerScanner {
    pub async fn new() -> Result<Self, ScanError> {
        let session = Session::new().await?;
        let adapter = session.default_adapter().await?;
        let powered = adapter.is_powered().await?;

        Ok(BluerScanner {
            _session: session,
            adapter,
            runtime: Handle::current(),
            powered: Arc::new(AtomicBool::new(powered)),
            scan_task: Mutex::new(None),
        })
    }
}

impl Scanner for BluerScanner {
    fn is_ready(&self) -> bool {
        self.powered.load(Ordering::SeqCst)
    }

    fn on_ready(&self, notify: Box<dyn FnOnce() + Send + 'static>) {
        let adapter = self.adapter.clone();
        let powered = Arc::clone(&self.powered);
        self.runtime.spawn(async move {
            if adapter.set_powered(true).await.is_ok() {
                powered.store(true, Ordering::SeqCst);
                notify();
            }
        });
    }

    fn start_scanning(&self, filter: &ScanFilter, handler: AdvertisementHandler) {
        let adapter = self.adapter.clone();
        let filter = filter.clone();
        let handler: Arc<dyn Fn(RawAdvertisement) + Send + Sync> = Arc::from(handler);
        let task = self.runtime.spawn(scan_loop(adapter, filter, handler));
        *self.scan_task.lock().unwrap() = Some(task);
    }

    fn stop_scanning(&self) {
        // Aborting drops the discovery stream, which ends the BlueZ scan.
        if let Some(task) = self.scan_task.lock().unwrap().take() {
            task.abort();
        }
    }
}

/// Expand a 16-bit service id in hex form to the full 128-bit UUID.
fn expand_service_uuid(short: &str) -> Option<Uuid> {
    let value = u32::from_str_radix(short, 16).ok()?;
    Some(Uuid::from_u128(BLUETOOTH_BASE_UUID | (u128::from(value) << 96)))
}

/// Rebuild the raw manufacturer-data payload from bluer's keyed form.
///
/// The IBS-TH1 puts measurement bytes where the company id normally sits, so
/// BlueZ splits the first two payload bytes off as the map key. The raw frame
/// is the key in little-endian order followed by the remaining bytes. If a
/// device carries several entries, the one with the sensor's frame length
/// wins.
fn raw_manufacturer_payload(data: &HashMap<u16, Vec<u8>>) -> Option<Vec<u8>> {
    let mut fallback = None;
    for (id, bytes) in data {
        let mut payload = Vec::with_capacity(2 + bytes.len());
        payload.extend_from_slice(&id.to_le_bytes());
        payload.extend_from_slice(bytes);
        if payload.len() == crate::frame::FRAME_LEN {
            return Some(payload);
        }
        fallback.get_or_insert(payload);
    }
    fallback
}

async fn scan_loop(
    adapter: Adapter,
    filter: ScanFilter,
    handler: Arc<dyn Fn(RawAdvertisement) + Send + Sync>,
) {
    let mut uuids = std::collections::HashSet::new();
    if let Some(uuid) = expand_service_uuid(filter.service_uuid) {
        uuids.insert(uuid);
    }
    let discovery_filter = DiscoveryFilter {
        uuids,
        duplicate_data: filter.allow_duplicates,
        transport: DiscoveryTransport::Le,
        ..Default::default()
    };
    if adapter.set_discovery_filter(discovery_filter).await.is_err() {
        return;
    }
    let Ok(mut discovery) = adapter.discover_devices().await else {
        return;
    };

    // Per-device watchers; dropped (and thereby aborted) with this task.
    let mut watchers = JoinSet::new();

    while let Some(event) = discovery.next().await {
        let AdapterEvent::DeviceAdded(address) = event else {
            continue;
        };
        let Ok(device) = adapter.device(address) else {
            continue;
        };
        let device_id = DeviceId::from(address);

        // Snapshot of the advertisement that triggered discovery.
        let local_name = device.name().await.ok().flatten();
        if let Ok(Some(data)) = device.manufacturer_data().await {
            handler(RawAdvertisement {
                device_id,
                local_name: local_name.clone(),
                manufacturer_data: raw_manufacturer_payload(&data),
            });
        }

        // Repeat advertisements arrive as property changes on the device.
        let handler = Arc::clone(&handler);
        watchers.spawn(async move {
            let Ok(mut events) = device.events().await else {
                return;
            };
            let mut local_name = local_name;
            while let Some(event) = events.next().await {
                let DeviceEvent::PropertyChanged(property) = event;
                match property {
                    DeviceProperty::Name(name) => local_name = Some(name),
                    DeviceProperty::ManufacturerData(data) => {
                        handler(RawAdvertisement {
                            device_id,
                            local_name: local_name.clone(),
                            manufacturer_data: raw_manufacturer_payload(&data),
                        });
                    }
                    _ => {}
                }
            }
        });
    }
}

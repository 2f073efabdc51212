use crate::device_id::DeviceId;
use crate::frame::crc16_arc;
use crate::scanner::RawAdvertisement;

/// A stable device id for unit tests.
pub const TEST_DEVICE: DeviceId = DeviceId::new([0x49, 0x42, 0x53, 0x00, 0x00, 0x01]);

/// Build a wire-valid 9-byte frame with the checksum computed and inserted.
///
/// `temperature_raw` and `humidity_raw` are the centi-unit wire encodings
/// (e.g. `2525` for 25.25 C, `0xFDF5` for -5.23 C).
pub fn frame(temperature_raw: u16, humidity_raw: u16, probe: u8, battery: u8) -> Vec<u8> {
    let [t0, t1] = temperature_raw.to_le_bytes();
    let [h0, h1] = humidity_raw.to_le_bytes();
    let crc = crc16_arc(&[t0, t1, h0, h1, probe]).to_le_bytes();
    vec![t0, t1, h0, h1, probe, crc[0], crc[1], battery, 0x00]
}

/// Build a raw advertisement from `TEST_DEVICE` with the given name/payload.
pub fn advertisement(
    local_name: Option<&str>,
    manufacturer_data: Option<Vec<u8>>,
) -> RawAdvertisement {
    RawAdvertisement {
        device_id: TEST_DEVICE,
        local_name: local_name.map(str::to_string),
        manufacturer_data,
    }
}

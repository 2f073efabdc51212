//! Human-readable names for sensor devices.
//!
//! The IBS-TH1 advertises the same "sps" name on every unit, so output keyed
//! only by Bluetooth address is hard to read with more than one sensor
//! around. Aliases map a device id to a label like "Cellar".

use crate::device_id::DeviceId;
use std::collections::HashMap;

/// Device-id-to-name lookup built from the parsed aliases.
pub type AliasMap = HashMap<DeviceId, String>;

/// A parsed alias mapping a device id to a human-readable name.
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub id: DeviceId,
    pub name: String,
}

/// Parse an alias in the format `AA:BB:CC:DD:EE:FF=Name`.
///
/// The address part must be a valid device id; the name is taken verbatim.
pub fn parse_alias(src: &str) -> Result<Alias, String> {
    let (address, name) = src
        .split_once('=')
        .ok_or_else(|| "invalid alias: expected format ID=NAME".to_string())?;
    let id = address
        .parse::<DeviceId>()
        .map_err(|e| format!("invalid alias: {}", e))?;
    Ok(Alias {
        id,
        name: name.to_string(),
    })
}

/// Collect parsed aliases into a lookup map.
pub fn to_map(aliases: &[Alias]) -> AliasMap {
    aliases
        .iter()
        .map(|a| (a.id, a.name.clone()))
        .collect()
}

/// Resolve the display name for a device: its alias, or the id itself.
pub fn resolve_name(id: &DeviceId, aliases: &AliasMap) -> String {
    aliases
        .get(id)
        .cloned()
        .unwrap_or_else(|| id.to_string())
}

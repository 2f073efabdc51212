//! Per-device rate limiting for emitted readings.
//!
//! The IBS-TH1 broadcasts a couple of times per second while its values
//! change slowly, so the listener can cap output to one reading per device
//! per interval.

use crate::device_id::DeviceId;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Allows at most one event per device per interval.
///
/// Devices are tracked independently and the first event for a device always
/// passes. A passing event resets that device's timer.
#[derive(Debug)]
pub struct Throttle {
    interval: Duration,
    last_emitted: HashMap<DeviceId, Instant>,
}

impl Throttle {
    pub fn new(interval: Duration) -> Self {
        Throttle {
            interval,
            last_emitted: HashMap::new(),
        }
    }

    /// Whether an event from `device` should be emitted now.
    pub fn should_emit(&mut self, device: DeviceId) -> bool {
        let now = Instant::now();
        match self.last_emitted.get(&device) {
            Some(last) if now.duration_since(*last) < self.interval => false,
            _ => {
                self.last_emitted.insert(device, now);
                true
            }
        }
    }
}

/// Parse a duration like `3s`, `1m`, `2h` or `500ms`.
///
/// A bare number is interpreted as seconds.
pub fn parse_duration(src: &str) -> Result<Duration, String> {
    let src = src.trim();
    if src.is_empty() {
        return Err("empty duration string".to_string());
    }

    let (number, unit): (&str, fn(u64) -> Duration) =
        if let Some(number) = src.strip_suffix("ms") {
            (number, Duration::from_millis)
        } else if let Some(number) = src.strip_suffix('h') {
            (number, |h| Duration::from_secs(h * 3600))
        } else if let Some(number) = src.strip_suffix('m') {
            (number, |m| Duration::from_secs(m * 60))
        } else {
            (src.strip_suffix('s').unwrap_or(src), Duration::from_secs)
        };

    number
        .trim()
        .parse()
        .map(unit)
        .map_err(|_| format!("invalid duration: {}", src))
}

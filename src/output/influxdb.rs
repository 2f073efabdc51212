//! InfluxDB line protocol output formatter.

use crate::output::OutputFormatter;
use crate::reading::Reading;
use std::collections::BTreeMap;
use std::fmt;
use std::time::SystemTime;

/// Field values for InfluxDB line protocol
#[derive(Debug, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Integer(i64),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::Float(num) => write!(f, "{num}"),
            FieldValue::Integer(num) => write!(f, "{num}i"),
        }
    }
}

/// Data point in InfluxDB line protocol
#[derive(Debug)]
pub struct DataPoint {
    pub measurement: String,
    pub tag_set: BTreeMap<String, String>,
    pub field_set: BTreeMap<String, FieldValue>,
    pub timestamp: Option<SystemTime>,
}

impl fmt::Display for DataPoint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.measurement)?;
        for (key, value) in self.tag_set.iter() {
            write!(f, ",{}={}", key, value)?;
        }
        let mut separator = ' ';
        for (key, value) in self.field_set.iter() {
            write!(f, "{}{}={}", separator, key, value)?;
            separator = ',';
        }
        if let Some(time) = self.timestamp
            && let Ok(elapsed) = time.duration_since(SystemTime::UNIX_EPOCH)
        {
            write!(f, " {}", elapsed.as_nanos())?;
        }
        Ok(())
    }
}

/// InfluxDB line protocol formatter.
///
/// Emits one line per successful reading, tagged with the device id, its
/// resolved display name and the probe type.
pub struct InfluxDbFormatter {
    measurement_name: String,
}

impl InfluxDbFormatter {
    pub fn new(measurement_name: String) -> Self {
        Self { measurement_name }
    }

    fn to_data_point(&self, reading: &Reading, name: &str) -> DataPoint {
        let mut tag_set = BTreeMap::new();
        tag_set.insert("id".to_string(), reading.device_id.to_string());
        tag_set.insert("name".to_string(), name.to_string());
        tag_set.insert("probe".to_string(), reading.probe_type.to_string());

        let mut field_set = BTreeMap::new();
        if let Some(temperature) = reading.temperature {
            field_set.insert("temperature".to_string(), FieldValue::Float(temperature));
        }
        if let Some(humidity) = reading.humidity {
            field_set.insert("humidity".to_string(), FieldValue::Float(humidity));
        }
        if let Some(battery) = reading.battery {
            field_set.insert("battery".to_string(), FieldValue::Integer(i64::from(battery)));
        }

        DataPoint {
            measurement: self.measurement_name.clone(),
            tag_set,
            field_set,
            timestamp: Some(reading.timestamp),
        }
    }
}

impl OutputFormatter for InfluxDbFormatter {
    fn format(&self, reading: &Reading, name: &str) -> String {
        format!("{}", self.to_data_point(reading, name))
    }
}

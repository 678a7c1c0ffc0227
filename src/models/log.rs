// Device log rows: raw stored form, validated entries, and the ingest payload

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::CorrosionStatus;

/// Numeric channels per device log row (sensor1..sensor4).
pub const SENSOR_COUNT: usize = 4;

/// What each sensor slot measures. Index 0..3 maps to sensor1..sensor4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SensorChannel {
    Humidity,
    Ph,
    Conductivity,
    DewPoint,
}

impl SensorChannel {
    pub const ALL: [SensorChannel; SENSOR_COUNT] = [
        SensorChannel::Humidity,
        SensorChannel::Ph,
        SensorChannel::Conductivity,
        SensorChannel::DewPoint,
    ];

    pub fn index(self) -> usize {
        match self {
            SensorChannel::Humidity => 0,
            SensorChannel::Ph => 1,
            SensorChannel::Conductivity => 2,
            SensorChannel::DewPoint => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SensorChannel::Humidity => "Humidity",
            SensorChannel::Ph => "pH",
            SensorChannel::Conductivity => "Conductivity",
            SensorChannel::DewPoint => "Dew point",
        }
    }

    pub fn unit(self) -> &'static str {
        match self {
            SensorChannel::Humidity => "%RH",
            SensorChannel::Ph => "pH",
            SensorChannel::Conductivity => "µS/cm",
            SensorChannel::DewPoint => "°C",
        }
    }
}

/// One monitor_ship_log row exactly as stored (TEXT columns, not yet validated).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogRow {
    pub device_id: String,
    pub timestamp: String,
    pub corrosion_status: Option<String>,
    pub sensors: [Option<String>; SENSOR_COUNT],
}

/// One validated observation from one device.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceLogEntry {
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub sensors: [Option<f64>; SENSOR_COUNT],
    pub status: Option<CorrosionStatus>,
}

impl DeviceLogEntry {
    /// Entry with no readings and no status.
    pub fn new(device_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp,
            sensors: [None; SENSOR_COUNT],
            status: None,
        }
    }

    pub fn with_sensor(mut self, channel: SensorChannel, value: f64) -> Self {
        self.sensors[channel.index()] = Some(value);
        self
    }

    pub fn with_status(mut self, status: CorrosionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn sensor(&self, channel: SensorChannel) -> Option<f64> {
        self.sensors[channel.index()]
    }
}

/// Ingest payload for POST /api/devices/{device_id}/logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLogRow {
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sensor1: Option<f64>,
    #[serde(default)]
    pub sensor2: Option<f64>,
    #[serde(default)]
    pub sensor3: Option<f64>,
    #[serde(default)]
    pub sensor4: Option<f64>,
    #[serde(default)]
    pub corrosion_status: Option<String>,
}

impl NewLogRow {
    pub fn sensors(&self) -> [Option<f64>; SENSOR_COUNT] {
        [self.sensor1, self.sensor2, self.sensor3, self.sensor4]
    }
}

/// Parse a stored timestamp. Accepts RFC 3339 (any offset), `YYYY-MM-DD HH:MM:SS[.f]+HH[:MM]`,
/// and naive date-times (space or `T` separated), which are read as UTC.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%#z") {
        return Some(dt.with_timezone(&Utc));
    }
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// Parse a stored sensor reading. Empty, non-numeric and non-finite values are absent.
pub fn parse_sensor_value(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

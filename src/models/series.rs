// Bucketed sensor history: one point per hour or day.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::{CorrosionStatus, SENSOR_COUNT, SensorChannel};

/// Bucket width for sensor history; serializes to lowercase JSON ("hour", "day").
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Hour,
    Day,
}

impl Granularity {
    pub fn step(self) -> TimeDelta {
        match self {
            Granularity::Hour => TimeDelta::hours(1),
            Granularity::Day => TimeDelta::days(1),
        }
    }
}

/// One time bucket. Gap markers (dense series only) have `entry_count == 0`,
/// no averages and no status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedPoint {
    pub bucket_start: DateTime<Utc>,
    /// Mean of the present readings per channel; `None` when no entry in the bucket had one.
    pub sensor_averages: [Option<f64>; SENSOR_COUNT],
    /// Status of the latest entry in the bucket.
    pub representative_status: Option<CorrosionStatus>,
    pub entry_count: usize,
}

impl AggregatedPoint {
    pub fn gap(bucket_start: DateTime<Utc>) -> Self {
        Self {
            bucket_start,
            sensor_averages: [None; SENSOR_COUNT],
            representative_status: None,
            entry_count: 0,
        }
    }

    pub fn is_gap(&self) -> bool {
        self.entry_count == 0
    }

    pub fn average(&self, channel: SensorChannel) -> Option<f64> {
        self.sensor_averages[channel.index()]
    }
}

/// Chart row as served to the dashboard: `{timestamp, sensor1..4, status, count}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub timestamp: DateTime<Utc>,
    pub sensor1: Option<f64>,
    pub sensor2: Option<f64>,
    pub sensor3: Option<f64>,
    pub sensor4: Option<f64>,
    pub status: Option<CorrosionStatus>,
    pub count: usize,
}

impl From<&AggregatedPoint> for HistoryRecord {
    fn from(p: &AggregatedPoint) -> Self {
        let [sensor1, sensor2, sensor3, sensor4] = p.sensor_averages;
        Self {
            timestamp: p.bucket_start,
            sensor1,
            sensor2,
            sensor3,
            sensor4,
            status: p.representative_status,
            count: p.entry_count,
        }
    }
}

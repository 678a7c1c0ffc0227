// Sensor history bucketing: device log rows -> hourly/daily series for charts.
// Pure over its inputs; window bounds always come from the caller, never the clock.

use std::collections::BTreeMap;

use chrono::{DateTime, FixedOffset, Offset, TimeDelta, Timelike, Utc};
use thiserror::Error;

use crate::models::{
    AggregatedPoint, CorrosionStatus, DeviceLogEntry, Granularity, RawLogRow, SENSOR_COUNT,
    parse_sensor_value, parse_timestamp,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AggregateError {
    #[error("invalid window: start {start} is after end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("invalid log entry: {reason}")]
    InvalidEntry { reason: String },
}

/// Series plus the number of stored rows that could not be used.
/// `skipped` is diagnostic only; the points never depend on it.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutcome {
    pub points: Vec<AggregatedPoint>,
    pub skipped: usize,
}

/// Validate a stored row. Bad timestamps and empty device ids are `InvalidEntry`;
/// unreadable sensor values and unknown status labels are absent.
pub fn parse_entry(row: &RawLogRow) -> Result<DeviceLogEntry, AggregateError> {
    if row.device_id.trim().is_empty() {
        return Err(AggregateError::InvalidEntry {
            reason: "empty device id".into(),
        });
    }
    let timestamp =
        parse_timestamp(&row.timestamp).ok_or_else(|| AggregateError::InvalidEntry {
            reason: format!(
                "unparseable timestamp {:?} (device {})",
                row.timestamp, row.device_id
            ),
        })?;
    Ok(DeviceLogEntry {
        device_id: row.device_id.clone(),
        timestamp,
        sensors: std::array::from_fn(|i| row.sensors[i].as_deref().and_then(parse_sensor_value)),
        status: row
            .corrosion_status
            .as_deref()
            .and_then(CorrosionStatus::parse),
    })
}

/// Aggregate with UTC buckets. See [`LogAggregator::aggregate`].
pub fn aggregate(
    entries: &[DeviceLogEntry],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
    granularity: Granularity,
    dense_fill: bool,
) -> Result<Vec<AggregatedPoint>, AggregateError> {
    LogAggregator::utc().aggregate(entries, window_start, window_end, granularity, dense_fill)
}

/// Buckets log entries by hour or day in a fixed reference zone (UTC unless a ship-local
/// offset is given). Fixed offsets keep every day exactly 24 hours long.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogAggregator {
    offset: FixedOffset,
}

impl Default for LogAggregator {
    fn default() -> Self {
        Self::utc()
    }
}

impl LogAggregator {
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn with_offset(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// `None` when the offset is not strictly within ±24h.
    pub fn with_offset_minutes(minutes: i32) -> Option<Self> {
        minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .map(Self::with_offset)
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Start of the hour or day containing `ts`, in this aggregator's zone.
    pub fn bucket_start(&self, ts: DateTime<Utc>, granularity: Granularity) -> DateTime<Utc> {
        let local = ts.with_timezone(&self.offset);
        let secs_into_bucket = match granularity {
            Granularity::Hour => local.minute() * 60 + local.second(),
            Granularity::Day => local.num_seconds_from_midnight(),
        };
        let truncated = local
            - TimeDelta::seconds(i64::from(secs_into_bucket))
            - TimeDelta::nanoseconds(i64::from(local.nanosecond()));
        truncated.with_timezone(&Utc)
    }

    /// Every bucket start from the bucket holding `window_start` to the one holding
    /// `window_end`, inclusive and ascending.
    pub fn bucket_starts(
        &self,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        granularity: Granularity,
    ) -> Vec<DateTime<Utc>> {
        let last = self.bucket_start(window_end, granularity);
        let step = granularity.step();
        let mut out = Vec::new();
        let mut cursor = self.bucket_start(window_start, granularity);
        while cursor <= last {
            out.push(cursor);
            cursor += step;
        }
        out
    }

    /// Reduce `entries` to one point per non-empty bucket inside
    /// `[window_start, window_end]`, ascending by bucket start.
    ///
    /// Averages are per channel over present readings only. The bucket status is the
    /// label of its latest entry (exact timestamp ties: first in input order).
    /// With `dense_fill`, buckets without entries are emitted as gap markers.
    pub fn aggregate(
        &self,
        entries: &[DeviceLogEntry],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        granularity: Granularity,
        dense_fill: bool,
    ) -> Result<Vec<AggregatedPoint>, AggregateError> {
        if window_start > window_end {
            return Err(AggregateError::InvalidWindow {
                start: window_start,
                end: window_end,
            });
        }

        let mut buckets: BTreeMap<DateTime<Utc>, Bucket> = BTreeMap::new();
        for entry in entries
            .iter()
            .filter(|e| e.timestamp >= window_start && e.timestamp <= window_end)
        {
            buckets
                .entry(self.bucket_start(entry.timestamp, granularity))
                .or_default()
                .add(entry);
        }

        let points: Vec<AggregatedPoint> = buckets
            .into_iter()
            .map(|(start, bucket)| bucket.finish(start))
            .collect();

        if !dense_fill {
            return Ok(points);
        }

        let mut real = points.into_iter().peekable();
        let dense = self
            .bucket_starts(window_start, window_end, granularity)
            .into_iter()
            .map(|start| {
                real.next_if(|p| p.bucket_start == start)
                    .unwrap_or_else(|| AggregatedPoint::gap(start))
            })
            .collect();
        Ok(dense)
    }

    /// Parse stored rows, skip the invalid ones, then aggregate the rest.
    pub fn aggregate_rows(
        &self,
        rows: &[RawLogRow],
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
        granularity: Granularity,
        dense_fill: bool,
    ) -> Result<AggregateOutcome, AggregateError> {
        if window_start > window_end {
            return Err(AggregateError::InvalidWindow {
                start: window_start,
                end: window_end,
            });
        }
        let mut skipped = 0;
        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            match parse_entry(row) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    tracing::debug!(error = %e, "skipping log row");
                    skipped += 1;
                }
            }
        }
        if skipped > 0 {
            tracing::debug!(skipped, total = rows.len(), "log rows skipped during aggregation");
        }
        let points = self.aggregate(&entries, window_start, window_end, granularity, dense_fill)?;
        Ok(AggregateOutcome { points, skipped })
    }
}

/// Running sums for one bucket.
#[derive(Default)]
struct Bucket {
    sums: [f64; SENSOR_COUNT],
    counts: [u32; SENSOR_COUNT],
    entries: usize,
    latest: Option<(DateTime<Utc>, Option<CorrosionStatus>)>,
}

impl Bucket {
    fn add(&mut self, entry: &DeviceLogEntry) {
        self.entries += 1;
        for (i, value) in entry.sensors.iter().enumerate() {
            if let Some(v) = value {
                self.sums[i] += v;
                self.counts[i] += 1;
            }
        }
        // Strictly newer only: the first entry seen keeps an exact tie.
        if self.latest.is_none_or(|(ts, _)| entry.timestamp > ts) {
            self.latest = Some((entry.timestamp, entry.status));
        }
    }

    fn finish(self, bucket_start: DateTime<Utc>) -> AggregatedPoint {
        AggregatedPoint {
            bucket_start,
            sensor_averages: std::array::from_fn(|i| {
                (self.counts[i] > 0).then(|| self.sums[i] / f64::from(self.counts[i]))
            }),
            representative_status: self.latest.and_then(|(_, status)| status),
            entry_count: self.entries,
        }
    }
}

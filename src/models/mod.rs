// Domain models: ships, device logs, bucketed history, health classification

mod log;
mod series;
mod ship;
mod status;

pub use log::{
    DeviceLogEntry, NewLogRow, RawLogRow, SENSOR_COUNT, SensorChannel, parse_sensor_value,
    parse_timestamp,
};
pub use series::{AggregatedPoint, Granularity, HistoryRecord};
pub use ship::{NewShip, Ship, ShipStatus};
pub use status::{
    CorrosionStatus, DeviceStatus, DeviceStatusSet, HealthLevel, MAX_DEVICES,
    OverallClassification, StatusColor,
};

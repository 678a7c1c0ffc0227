// Device handlers: registration, log ingestion, newest readings per device.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Json, response::IntoResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use crate::models::{CorrosionStatus, NewLogRow, SensorChannel, StatusColor};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct NewDevice {
    device_id: String,
}

/// POST /api/ships/{imo}/devices: attach a device in the lowest free slot (max four per ship).
pub(super) async fn register_device(
    State(state): State<AppState>,
    Path(imo): Path<String>,
    body: Result<Json<NewDevice>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(device) = body?;
    let slot = state.repo.register_device(&imo, &device.device_id).await?;
    tracing::info!(imo = %imo, device_id = %device.device_id, slot, "device registered");
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "imo": imo, "deviceId": device.device_id, "slot": slot })),
    ))
}

/// POST /api/devices/{device_id}/logs: store one reading.
pub(super) async fn ingest_log(
    State(state): State<AppState>,
    Path(device_id): Path<String>,
    body: Result<Json<NewLogRow>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(log) = body?;
    state.repo.insert_log(&device_id, &log).await?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "deviceId": device_id, "timestamp": log.timestamp })),
    ))
}

#[derive(Debug, Serialize)]
struct SensorReading {
    id: usize,
    channel: SensorChannel,
    unit: &'static str,
    value: Option<f64>,
}

#[derive(Debug, Serialize)]
struct DeviceReadings {
    device: String,
    id: usize,
    name: String,
    timestamp: DateTime<Utc>,
    status: Option<CorrosionStatus>,
    color: StatusColor,
    sensors: Vec<SensorReading>,
}

/// GET /api/ships/{imo}/latest: newest log of each device, in slot order.
/// Devices without a readable log are left out.
pub(super) async fn latest_readings(
    State(state): State<AppState>,
    Path(imo): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.repo.get_ship(&imo).await?;
    let devices = state.repo.list_device_slots(&imo).await?;

    let mut out = Vec::with_capacity(devices.len());
    for (slot, device) in devices {
        let Some(entry) = state.repo.latest_log_for_device(&device).await? else {
            continue;
        };
        out.push(DeviceReadings {
            id: slot,
            name: format!("Device {}", slot),
            timestamp: entry.timestamp,
            status: entry.status,
            color: entry
                .status
                .map(CorrosionStatus::color)
                .unwrap_or(StatusColor::Gray),
            sensors: SensorChannel::ALL
                .iter()
                .map(|&channel| SensorReading {
                    id: channel.index() + 1,
                    channel,
                    unit: channel.unit(),
                    value: entry.sensor(channel),
                })
                .collect(),
            device,
        });
    }
    Ok(Json(serde_json::json!({ "devices": out })))
}

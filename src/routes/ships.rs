// Ship handlers: list/create/update, the ship dashboard view and the device status monitor.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Json, response::IntoResponse};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use crate::classifier::classify;
use crate::models::{
    CorrosionStatus, DeviceLogEntry, DeviceStatusSet, Granularity, HealthLevel, HistoryRecord,
    NewShip, OverallClassification, SensorChannel, Ship, ShipStatus, StatusColor,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListShipsQuery {
    user_id: Option<i64>,
}

/// GET /api/ships: ships ordered by name, optionally for one owner account.
pub(super) async fn list_ships(
    State(state): State<AppState>,
    query: Result<Query<ListShipsQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let ships = state.repo.list_ships(query.user_id).await?;
    Ok(Json(serde_json::json!({
        "count": ships.len(),
        "ships": ships,
    })))
}

/// POST /api/ships: register a ship.
pub(super) async fn create_ship(
    State(state): State<AppState>,
    body: Result<Json<NewShip>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(new_ship) = body?;
    let ship = state.repo.create_ship(&new_ship).await?;
    tracing::info!(imo = %ship.imo, "ship registered");
    Ok((StatusCode::CREATED, Json(serde_json::json!({ "ship": ship }))))
}

#[derive(Debug, Deserialize)]
pub(super) struct StatusUpdate {
    status: String,
}

/// PUT /api/ships/{imo}: set Active/Inactive.
pub(super) async fn update_ship_status(
    State(state): State<AppState>,
    Path(imo): Path<String>,
    body: Result<Json<StatusUpdate>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(update) = body?;
    let status = match update.status.as_str() {
        "Active" => ShipStatus::Active,
        "Inactive" => ShipStatus::Inactive,
        _ => {
            return Err(ApiError::BadRequest(
                "Invalid status. Must be \"Active\" or \"Inactive\"".into(),
            ));
        }
    };
    let ship = state.repo.update_ship_status(&imo, status).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": format!("Ship status updated to {}", status.as_str()),
        "ship": ShipSummary::from(&ship),
    })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShipSummary {
    name: String,
    imo: String,
    status: ShipStatus,
    location: String,
    owner: String,
    year_built: i32,
}

impl From<&Ship> for ShipSummary {
    fn from(ship: &Ship) -> Self {
        Self {
            name: ship.ship_name.clone(),
            imo: ship.imo.clone(),
            status: ship.status,
            location: ship.route(),
            owner: ship.owner.clone(),
            year_built: ship.year_built,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct HealthView {
    level: HealthLevel,
    color: StatusColor,
    advisory: &'static str,
}

impl From<OverallClassification> for HealthView {
    fn from(c: OverallClassification) -> Self {
        Self {
            level: c.level,
            color: c.color,
            advisory: c.advisory(),
        }
    }
}

/// One channel of the ship's newest log row.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SensorView {
    id: usize,
    channel: SensorChannel,
    name: &'static str,
    unit: &'static str,
    value: Option<f64>,
    status: Option<CorrosionStatus>,
    color: StatusColor,
}

fn sensor_views(latest: &DeviceLogEntry) -> Vec<SensorView> {
    let color = latest
        .status
        .map(CorrosionStatus::color)
        .unwrap_or(StatusColor::Gray);
    SensorChannel::ALL
        .iter()
        .map(|&channel| SensorView {
            id: channel.index() + 1,
            channel,
            name: channel.label(),
            unit: channel.unit(),
            value: latest.sensor(channel),
            status: latest.status,
            color,
        })
        .collect()
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ShipDetail {
    #[serde(flatten)]
    summary: ShipSummary,
    health: HealthView,
    sensors: Vec<SensorView>,
    timestamp: Option<DateTime<Utc>>,
    corrosion_status: Option<CorrosionStatus>,
    sensor_history: Vec<HistoryRecord>,
    skipped_entries: usize,
    ship_monitor: DeviceStatusSet,
}

/// GET /api/ships/{imo}: dashboard view: ship, overall health, newest readings,
/// and hourly sensor history for the last `history_window_hours`.
pub(super) async fn ship_detail(
    State(state): State<AppState>,
    Path(imo): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let ship = state.repo.get_ship(&imo).await?;
    let statuses = state
        .repo
        .get_device_statuses(&imo)
        .await?
        .unwrap_or_default();
    let health = classify(&statuses);

    let mut latest: Option<DeviceLogEntry> = None;
    for device in state.repo.list_devices(&imo).await? {
        if let Some(entry) = state.repo.latest_log_for_device(&device).await?
            && latest.as_ref().is_none_or(|l| entry.timestamp > l.timestamp)
        {
            latest = Some(entry);
        }
    }

    let window_end = Utc::now();
    let window_start =
        window_end - TimeDelta::hours(i64::from(state.config.dashboard.history_window_hours));
    let rows = state
        .repo
        .get_ship_logs(
            &imo,
            window_start,
            window_end,
            state.config.dashboard.history_limit,
        )
        .await?;
    let outcome = state.aggregator().aggregate_rows(
        &rows,
        window_start,
        window_end,
        Granularity::Hour,
        false,
    )?;

    Ok(Json(ShipDetail {
        summary: ShipSummary::from(&ship),
        health: health.into(),
        sensors: latest.as_ref().map(sensor_views).unwrap_or_default(),
        timestamp: latest.as_ref().map(|e| e.timestamp),
        corrosion_status: latest.as_ref().and_then(|e| e.status),
        sensor_history: outcome.points.iter().map(HistoryRecord::from).collect(),
        skipped_entries: outcome.skipped,
        ship_monitor: statuses,
    }))
}

/// GET /api/ship_monitor/{imo}: latest status per device slot and the overall health.
pub(super) async fn ship_monitor(
    State(state): State<AppState>,
    Path(imo): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.repo.get_ship(&imo).await?;
    let Some(statuses) = state.repo.get_device_statuses(&imo).await? else {
        return Err(ApiError::NotFound(format!("monitor for ship {} not found", imo)));
    };
    let health = HealthView::from(classify(&statuses));
    Ok(Json(serde_json::json!({
        "idShip": imo,
        "devices": statuses,
        "health": health,
    })))
}

// GET /api/ships/{imo}/history: sensor history over an explicit window.

use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::{Json, response::IntoResponse};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use crate::aggregation::LogAggregator;
use crate::models::{Granularity, HistoryRecord};

/// Cap on dense series length; gap markers are synthesized for every bucket in the window.
const MAX_DENSE_BUCKETS: i64 = 10_000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct HistoryQuery {
    /// Window start (RFC 3339). Defaults to `to` minus history_window_hours.
    from: Option<DateTime<Utc>>,
    /// Window end (RFC 3339). Defaults to now.
    to: Option<DateTime<Utc>>,
    #[serde(default)]
    granularity: Granularity,
    /// Emit gap markers for buckets without readings.
    #[serde(default)]
    dense: bool,
    /// Ship-local offset for bucket boundaries; overrides the configured one.
    offset_minutes: Option<i32>,
    limit: Option<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HistoryResponse {
    imo: String,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    granularity: Granularity,
    dense: bool,
    offset_minutes: i32,
    points: Vec<HistoryRecord>,
    skipped_entries: usize,
}

pub(super) async fn sensor_history(
    State(state): State<AppState>,
    Path(imo): Path<String>,
    query: Result<Query<HistoryQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    state.repo.get_ship(&imo).await?;

    let to = query.to.unwrap_or_else(Utc::now);
    let from = query.from.unwrap_or_else(|| {
        to - TimeDelta::hours(i64::from(state.config.dashboard.history_window_hours))
    });

    let aggregator = match query.offset_minutes {
        Some(minutes) => LogAggregator::with_offset_minutes(minutes).ok_or_else(|| {
            ApiError::BadRequest(format!("offsetMinutes out of range: {}", minutes))
        })?,
        None => state.aggregator(),
    };

    if query.dense
        && from <= to
        && (to - from).num_seconds() / query.granularity.step().num_seconds() >= MAX_DENSE_BUCKETS
    {
        return Err(ApiError::BadRequest(format!(
            "dense window spans more than {} buckets",
            MAX_DENSE_BUCKETS
        )));
    }

    let limit = query
        .limit
        .unwrap_or(state.config.dashboard.history_limit)
        .clamp(1, state.config.dashboard.history_limit);
    let rows = state.repo.get_ship_logs(&imo, from, to, limit).await?;
    let outcome =
        aggregator.aggregate_rows(&rows, from, to, query.granularity, query.dense)?;
    if outcome.skipped > 0 {
        tracing::debug!(imo = %imo, skipped = outcome.skipped, "history: unreadable log rows skipped");
    }

    Ok(Json(HistoryResponse {
        imo,
        from,
        to,
        granularity: query.granularity,
        dense: query.dense,
        offset_minutes: aggregator.offset().local_minus_utc() / 60,
        points: outcome.points.iter().map(HistoryRecord::from).collect(),
        skipped_entries: outcome.skipped,
    }))
}

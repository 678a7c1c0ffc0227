// HTTP routes: ships, devices, device logs, sensor history

mod devices;
mod error;
mod history;
mod http;
mod ships;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::aggregation::LogAggregator;
use crate::config::AppConfig;
use crate::ship_repo::ShipRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) repo: Arc<ShipRepo>,
    pub(crate) config: AppConfig,
}

impl AppState {
    /// Aggregator for the configured ship-local offset (validated at config load).
    pub(crate) fn aggregator(&self) -> LogAggregator {
        LogAggregator::with_offset_minutes(self.config.dashboard.ship_utc_offset_minutes)
            .unwrap_or_default()
    }
}

pub fn app(repo: Arc<ShipRepo>, config: AppConfig) -> Router {
    let state = AppState { repo, config };
    Router::new()
        .route("/", get(|| async { "hullwatch: ship hull corrosion monitor" })) // GET /
        .route("/version", get(http::version_handler)) // GET /version
        .route(
            "/api/ships",
            get(ships::list_ships).post(ships::create_ship),
        ) // GET, POST /api/ships
        .route(
            "/api/ships/{imo}",
            get(ships::ship_detail).put(ships::update_ship_status),
        ) // GET, PUT /api/ships/{imo}
        .route("/api/ships/{imo}/latest", get(devices::latest_readings)) // GET /api/ships/{imo}/latest
        .route("/api/ships/{imo}/history", get(history::sensor_history)) // GET /api/ships/{imo}/history
        .route("/api/ships/{imo}/devices", post(devices::register_device)) // POST /api/ships/{imo}/devices
        .route("/api/ship_monitor/{imo}", get(ships::ship_monitor)) // GET /api/ship_monitor/{imo}
        .route("/api/devices/{device_id}/logs", post(devices::ingest_log)) // POST /api/devices/{device_id}/logs
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}

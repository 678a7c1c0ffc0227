// Shared test helpers
#![allow(dead_code)]

use chrono::{DateTime, Utc};
use hullwatch::models::*;
use hullwatch::ship_repo::ShipRepo;
use tempfile::TempDir;

/// Parse an RFC 3339 timestamp; panics on bad input.
pub fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .unwrap()
        .with_timezone(&Utc)
}

pub fn new_ship(imo: &str, name: &str) -> NewShip {
    NewShip {
        imo: imo.into(),
        ship_name: name.into(),
        year_built: 2012,
        owner: "Blue Anchor Lines".into(),
        owner_contact: "ops@blueanchor.example".into(),
        location_from: "Rotterdam".into(),
        location_to: "Singapore".into(),
        coordinate_x: 51.9,
        coordinate_y: 4.4,
        status: None,
        user_id: None,
    }
}

pub fn new_log(timestamp: &str, humidity: f64, status: &str) -> NewLogRow {
    NewLogRow {
        timestamp: ts(timestamp),
        sensor1: Some(humidity),
        sensor2: Some(7.8),
        sensor3: Some(42.0),
        sensor4: Some(12.5),
        corrosion_status: Some(status.into()),
    }
}

/// Fresh repo in a temp dir. Keep the TempDir alive for the test's duration.
pub async fn temp_repo() -> (TempDir, ShipRepo) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("hullwatch.db");
    let repo = ShipRepo::connect(path.to_str().unwrap(), 2, 30)
        .await
        .unwrap();
    repo.init().await.unwrap();
    (dir, repo)
}

// Integration tests: HTTP endpoints over a temp SQLite store

mod common;

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{SecondsFormat, TimeDelta, Utc};
use common::{new_ship, temp_repo};
use hullwatch::config::AppConfig;
use hullwatch::routes;
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;

const TEST_CONFIG: &str = r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/test.db"
max_pool_size = 2

[dashboard]
history_window_hours = 24
history_limit = 1000
"#;

fn test_app_config() -> AppConfig {
    AppConfig::load_from_str(TEST_CONFIG).unwrap()
}

async fn test_server() -> (TestServer, TempDir) {
    let (dir, repo) = temp_repo().await;
    let app = routes::app(Arc::new(repo), test_app_config());
    (TestServer::new(app), dir)
}

/// Ship 9000001 with devices hull-a and hull-b.
async fn seeded_server() -> (TestServer, TempDir) {
    let (server, dir) = test_server().await;
    server
        .post("/api/ships")
        .json(&new_ship("9000001", "Aurora"))
        .await
        .assert_status(StatusCode::CREATED);
    for id in ["hull-a", "hull-b"] {
        server
            .post("/api/ships/9000001/devices")
            .json(&json!({ "deviceId": id }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    (server, dir)
}

async fn post_log(server: &TestServer, device: &str, body: Value) {
    server
        .post(&format!("/api/devices/{}/logs", device))
        .json(&body)
        .await
        .assert_status(StatusCode::CREATED);
}

#[tokio::test]
async fn test_root_endpoint() {
    let (server, _dir) = test_server().await;
    let response = server.get("/").await;
    response.assert_status_ok();
    response.assert_text("hullwatch: ship hull corrosion monitor");
}

#[tokio::test]
async fn test_version_endpoint() {
    let (server, _dir) = test_server().await;
    let response = server.get("/version").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json.get("name").and_then(|v| v.as_str()), Some("hullwatch"));
    assert!(json.get("version").and_then(|v| v.as_str()).is_some());
}

#[tokio::test]
async fn test_create_and_list_ships() {
    let (server, _dir) = test_server().await;
    let response = server
        .post("/api/ships")
        .json(&new_ship("9000001", "Aurora"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let json: Value = response.json();
    assert_eq!(json["ship"]["shipName"], "Aurora");
    assert_eq!(json["ship"]["status"], "Inactive");

    let response = server.get("/api/ships").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["count"], 1);
    assert_eq!(json["ships"][0]["imo"], "9000001");
}

#[tokio::test]
async fn test_create_ship_duplicate_is_conflict() {
    let (server, _dir) = seeded_server().await;
    let response = server
        .post("/api/ships")
        .json(&new_ship("9000001", "Copy"))
        .await;
    response.assert_status(StatusCode::CONFLICT);
    let json: Value = response.json();
    assert!(json["error"].as_str().unwrap().contains("9000001"));
}

#[tokio::test]
async fn test_create_ship_bad_payload_is_bad_request() {
    let (server, _dir) = test_server().await;
    let response = server
        .post("/api/ships")
        .json(&json!({ "imo": "9000001", "shipName": "Aurora" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let mut blank = new_ship("9000001", "Aurora");
    blank.owner = String::new();
    let response = server.post("/api/ships").json(&blank).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let json: Value = response.json();
    assert_eq!(json["error"], "Missing field: owner");
}

#[tokio::test]
async fn test_update_ship_status() {
    let (server, _dir) = seeded_server().await;
    let response = server
        .put("/api/ships/9000001")
        .json(&json!({ "status": "Active" }))
        .await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["success"], true);
    assert_eq!(json["ship"]["status"], "Active");
    assert_eq!(json["ship"]["location"], "Rotterdam → Singapore");

    let response = server
        .put("/api/ships/9000001")
        .json(&json!({ "status": "Sunk" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .put("/api/ships/1111111")
        .json(&json!({ "status": "Active" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_fifth_device_is_rejected() {
    let (server, _dir) = seeded_server().await;
    for id in ["hull-c", "hull-d"] {
        server
            .post("/api/ships/9000001/devices")
            .json(&json!({ "deviceId": id }))
            .await
            .assert_status(StatusCode::CREATED);
    }
    let response = server
        .post("/api/ships/9000001/devices")
        .json(&json!({ "deviceId": "hull-e" }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_ingest_log_for_unknown_device_is_not_found() {
    let (server, _dir) = seeded_server().await;
    let response = server
        .post("/api/devices/ghost/logs")
        .json(&json!({ "timestamp": "2024-05-01T10:00:00Z", "sensor1": 60.0 }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ship_monitor_classifies_worst_device() {
    let (server, _dir) = seeded_server().await;
    let response = server.get("/api/ship_monitor/9000001").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["health"]["level"], "Unknown");
    assert_eq!(json["health"]["color"], "gray");

    post_log(
        &server,
        "hull-a",
        json!({ "timestamp": "2024-05-01T10:00:00Z", "corrosionStatus": "Low" }),
    )
    .await;
    post_log(
        &server,
        "hull-b",
        json!({ "timestamp": "2024-05-01T10:00:00Z", "corrosionStatus": "high" }),
    )
    .await;

    let json: Value = server.get("/api/ship_monitor/9000001").await.json();
    assert_eq!(json["idShip"], "9000001");
    assert_eq!(json["health"]["level"], "Critical");
    assert_eq!(json["health"]["color"], "red");
    assert_eq!(json["devices"][0]["device"], "hull-a");
    assert_eq!(json["devices"][0]["status"], "Low");
    assert_eq!(json["devices"][1]["status"], "High");
}

#[tokio::test]
async fn test_ship_monitor_without_devices_is_not_found() {
    let (server, _dir) = test_server().await;
    server
        .post("/api/ships")
        .json(&new_ship("9000001", "Aurora"))
        .await
        .assert_status(StatusCode::CREATED);
    let response = server.get("/api/ship_monitor/9000001").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_hourly_dense_window() {
    let (server, _dir) = seeded_server().await;
    post_log(
        &server,
        "hull-a",
        json!({ "timestamp": "2024-05-01T00:15:00Z", "sensor1": 10.0, "corrosionStatus": "Low" }),
    )
    .await;
    post_log(
        &server,
        "hull-b",
        json!({ "timestamp": "2024-05-01T00:45:00Z", "sensor1": 20.0, "corrosionStatus": "Medium" }),
    )
    .await;
    post_log(
        &server,
        "hull-a",
        json!({ "timestamp": "2024-05-01T02:10:00Z", "sensor2": 7.5 }),
    )
    .await;

    let response = server
        .get("/api/ships/9000001/history?from=2024-05-01T00:00:00Z&to=2024-05-01T03:00:00Z&dense=true")
        .await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["granularity"], "hour");
    assert_eq!(json["skippedEntries"], 0);
    let points = json["points"].as_array().unwrap();
    assert_eq!(points.len(), 4);
    assert_eq!(points[0]["sensor1"], 15.0);
    assert_eq!(points[0]["status"], "Medium");
    assert_eq!(points[0]["count"], 2);
    assert_eq!(points[1]["count"], 0);
    assert!(points[1]["sensor1"].is_null());
    assert!(points[2]["sensor1"].is_null());
    assert_eq!(points[2]["sensor2"], 7.5);
    assert!(points[2]["status"].is_null());
}

#[tokio::test]
async fn test_history_daily_with_offset() {
    let (server, _dir) = seeded_server().await;
    post_log(
        &server,
        "hull-a",
        json!({ "timestamp": "2024-05-01T20:00:00Z", "sensor1": 10.0 }),
    )
    .await;
    post_log(
        &server,
        "hull-a",
        json!({ "timestamp": "2024-05-01T23:00:00Z", "sensor1": 30.0 }),
    )
    .await;

    let json: Value = server
        .get("/api/ships/9000001/history?from=2024-04-30T00:00:00Z&to=2024-05-03T00:00:00Z&granularity=day")
        .await
        .json();
    assert_eq!(json["points"].as_array().unwrap().len(), 1);
    assert_eq!(json["points"][0]["sensor1"], 20.0);

    // UTC+2: 23:00Z falls on the next local day
    let json: Value = server
        .get("/api/ships/9000001/history?from=2024-04-30T00:00:00Z&to=2024-05-03T00:00:00Z&granularity=day&offsetMinutes=120")
        .await
        .json();
    assert_eq!(json["offsetMinutes"], 120);
    let points = json["points"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["timestamp"], "2024-04-30T22:00:00Z");
    assert_eq!(points[1]["sensor1"], 30.0);
}

#[tokio::test]
async fn test_history_rejects_bad_queries() {
    let (server, _dir) = seeded_server().await;
    let response = server
        .get("/api/ships/9000001/history?from=2024-05-02T00:00:00Z&to=2024-05-01T00:00:00Z")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .get("/api/ships/9000001/history?granularity=week")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server
        .get("/api/ships/9000001/history?from=2000-01-01T00:00:00Z&to=2024-01-01T00:00:00Z&dense=true")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let response = server.get("/api/ships/1111111/history").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_ship_detail_and_latest_readings() {
    let (server, _dir) = seeded_server().await;
    let recent = (Utc::now() - TimeDelta::minutes(30)).to_rfc3339_opts(SecondsFormat::Secs, true);
    post_log(
        &server,
        "hull-a",
        json!({
            "timestamp": recent,
            "sensor1": 72.5,
            "sensor2": 8.1,
            "sensor3": 40.0,
            "sensor4": 11.0,
            "corrosionStatus": "Medium"
        }),
    )
    .await;

    let response = server.get("/api/ships/9000001").await;
    response.assert_status_ok();
    let json: Value = response.json();
    assert_eq!(json["name"], "Aurora");
    assert_eq!(json["health"]["level"], "Warning");
    assert_eq!(json["corrosionStatus"], "Medium");
    let sensors = json["sensors"].as_array().unwrap();
    assert_eq!(sensors.len(), 4);
    assert_eq!(sensors[0]["value"], 72.5);
    assert_eq!(sensors[0]["color"], "yellow");
    assert_eq!(json["sensorHistory"].as_array().unwrap().len(), 1);

    let json: Value = server.get("/api/ships/9000001/latest").await.json();
    let devices = json["devices"].as_array().unwrap();
    // hull-b has no readings yet
    assert_eq!(devices.len(), 1);
    assert_eq!(devices[0]["device"], "hull-a");
    assert_eq!(devices[0]["name"], "Device 1");
    assert_eq!(devices[0]["sensors"][3]["value"], 11.0);
}

#[tokio::test]
async fn test_unknown_ship_detail_is_not_found() {
    let (server, _dir) = test_server().await;
    let response = server.get("/api/ships/1111111").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let json: Value = response.json();
    assert_eq!(json["error"], "ship 1111111 not found");
}

#[tokio::test]
async fn test_monitor_keeps_status_with_device_after_out_of_order_registration() {
    let (server, _dir) = test_server().await;
    server
        .post("/api/ships")
        .json(&new_ship("9000001", "Aurora"))
        .await
        .assert_status(StatusCode::CREATED);
    let response = server
        .post("/api/ships/9000001/devices")
        .json(&json!({ "deviceId": "dev-b" }))
        .await;
    response.assert_status(StatusCode::CREATED);
    assert_eq!(response.json::<Value>()["slot"], 1);
    post_log(
        &server,
        "dev-b",
        json!({ "timestamp": "2024-05-01T10:00:00Z", "corrosionStatus": "High" }),
    )
    .await;
    let response = server
        .post("/api/ships/9000001/devices")
        .json(&json!({ "deviceId": "dev-a" }))
        .await;
    assert_eq!(response.json::<Value>()["slot"], 2);
    post_log(
        &server,
        "dev-b",
        json!({ "timestamp": "2024-05-01T11:00:00Z", "corrosionStatus": "Low" }),
    )
    .await;

    let json: Value = server.get("/api/ship_monitor/9000001").await.json();
    assert_eq!(json["health"]["level"], "Good");
    assert_eq!(json["devices"][0]["device"], "dev-b");
    assert_eq!(json["devices"][0]["status"], "Low");
    assert_eq!(json["devices"][1]["device"], "dev-a");
    assert!(json["devices"][1]["status"].is_null());
}

#[tokio::test]
async fn test_history_old_window_beyond_newest_rows() {
    let (_dir, repo) = temp_repo().await;
    let mut config = test_app_config();
    config.dashboard.history_limit = 2;
    let server = TestServer::new(routes::app(Arc::new(repo), config));
    server
        .post("/api/ships")
        .json(&new_ship("9000001", "Aurora"))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/api/ships/9000001/devices")
        .json(&json!({ "deviceId": "hull-a" }))
        .await
        .assert_status(StatusCode::CREATED);
    for (at, humidity) in [
        ("2024-01-01T06:10:00Z", 40.0),
        ("2024-01-02T01:00:00Z", 80.0),
        ("2024-01-02T02:00:00Z", 81.0),
        ("2024-01-02T03:00:00Z", 82.0),
    ] {
        post_log(&server, "hull-a", json!({ "timestamp": at, "sensor1": humidity })).await;
    }

    let json: Value = server
        .get("/api/ships/9000001/history?from=2024-01-01T00:00:00Z&to=2024-01-01T23:59:59Z")
        .await
        .json();
    let points = json["points"].as_array().unwrap();
    assert_eq!(points.len(), 1);
    assert_eq!(points[0]["timestamp"], "2024-01-01T06:00:00Z");
    assert_eq!(points[0]["sensor1"], 40.0);
}

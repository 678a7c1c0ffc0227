// Maintenance worker tests: one prune pass, config mapping

mod common;

use common::{new_log, new_ship, temp_repo, ts};
use hullwatch::config::AppConfig;
use hullwatch::maintenance_worker::{MaintenanceWorkerConfig, VacuumSchedule, run_one_tick};
use std::time::Duration;

#[tokio::test]
async fn run_one_tick_prunes_relative_to_given_now() {
    let (_dir, repo) = temp_repo().await;
    repo.create_ship(&new_ship("9000001", "Aurora")).await.unwrap();
    repo.register_device("9000001", "hull-a").await.unwrap();
    for at in [
        "2024-03-01T00:00:00Z",
        "2024-03-02T00:00:00Z",
        "2024-04-20T00:00:00Z",
    ] {
        repo.insert_log("hull-a", &new_log(at, 50.0, "Low"))
            .await
            .unwrap();
    }

    let pruned = run_one_tick(&repo, ts("2024-04-25T00:00:00Z")).await.unwrap();
    assert_eq!(pruned, 2);
    let pruned = run_one_tick(&repo, ts("2024-04-25T00:00:00Z")).await.unwrap();
    assert_eq!(pruned, 0);
    let rows = repo
        .get_ship_logs("9000001", ts("2024-01-01T00:00:00Z"), ts("2024-12-31T00:00:00Z"), 10)
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn run_one_tick_on_empty_store_is_noop() {
    let (_dir, repo) = temp_repo().await;
    let pruned = run_one_tick(&repo, ts("2030-01-01T00:00:00Z")).await.unwrap();
    assert_eq!(pruned, 0);
}

#[test]
fn worker_config_from_database_config() {
    let config = AppConfig::load_from_str(
        r#"
[server]
port = 8081
host = "0.0.0.0"

[database]
path = "data/hullwatch.db"
max_pool_size = 2
maintenance_interval_secs = 120
vacuum_schedule = "0 30 2 * * Sun"
"#,
    )
    .unwrap();
    let worker = MaintenanceWorkerConfig::from(&config.database);
    assert_eq!(worker.maintenance_interval_secs, 120);
    assert_eq!(worker.vacuum_schedule.as_deref(), Some("0 30 2 * * Sun"));
    assert_eq!(worker.vacuum_interval_secs, 86_400);
}

fn worker_config(vacuum_schedule: Option<&str>) -> MaintenanceWorkerConfig {
    MaintenanceWorkerConfig {
        maintenance_interval_secs: 3600,
        vacuum_schedule: vacuum_schedule.map(String::from),
        vacuum_interval_secs: 7200,
    }
}

#[test]
fn vacuum_schedule_fixed_interval_without_cron() {
    let schedule = VacuumSchedule::from_config(&worker_config(None)).unwrap();
    assert!(matches!(schedule, VacuumSchedule::Every(d) if d == Duration::from_secs(7200)));
    assert_eq!(
        schedule.next_after(&ts("2024-05-01T04:00:00Z")),
        Some(ts("2024-05-01T06:00:00Z"))
    );
}

#[test]
fn vacuum_schedule_cron_takes_precedence() {
    let schedule = VacuumSchedule::from_config(&worker_config(Some("0 0 3 * * *"))).unwrap();
    assert_eq!(
        schedule.next_after(&ts("2024-05-01T04:00:00Z")),
        Some(ts("2024-05-02T03:00:00Z"))
    );
    assert_eq!(
        schedule.next_after(&ts("2024-05-01T02:59:00Z")),
        Some(ts("2024-05-01T03:00:00Z"))
    );
}

#[test]
fn vacuum_schedule_rejects_bad_cron() {
    assert!(VacuumSchedule::from_config(&worker_config(Some("nightly"))).is_err());
}

// Background worker: prune device logs past retention every maintenance_interval_secs.
// VACUUM runs on a configurable schedule (cron expression or fixed interval).

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, TimeDelta, TimeZone, Utc};
use tracing::{debug, info, instrument, warn};

use crate::config::DatabaseConfig;
use crate::ship_repo::{RepoError, ShipRepo};

/// Config for the maintenance worker.
#[derive(Debug, Clone)]
pub struct MaintenanceWorkerConfig {
    pub maintenance_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *" = 03:00 daily). Uses local time.
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    pub vacuum_interval_secs: u64,
}

impl From<&DatabaseConfig> for MaintenanceWorkerConfig {
    fn from(db: &DatabaseConfig) -> Self {
        Self {
            maintenance_interval_secs: db.maintenance_interval_secs,
            vacuum_schedule: db.vacuum_schedule.clone(),
            vacuum_interval_secs: db.vacuum_interval_secs,
        }
    }
}

/// Spawns the maintenance worker. Returns a join handle.
pub fn spawn(
    repo: Arc<ShipRepo>,
    config: MaintenanceWorkerConfig,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        run(repo, config).await;
    })
}

#[instrument(skip(repo), fields(interval_secs = config.maintenance_interval_secs))]
async fn run(repo: Arc<ShipRepo>, config: MaintenanceWorkerConfig) {
    let mut prune_interval =
        tokio::time::interval(Duration::from_secs(config.maintenance_interval_secs));
    prune_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let (vacuum_tx, mut vacuum_rx) = tokio::sync::mpsc::channel::<()>(1);
    tokio::spawn(vacuum_scheduler(config.clone(), vacuum_tx));

    loop {
        tokio::select! {
            _ = prune_interval.tick() => {
                if let Err(e) = run_one_tick(&repo, Utc::now()).await {
                    warn!(error = %e, "maintenance tick failed");
                }
            }
            Some(()) = vacuum_rx.recv() => {
                if let Err(e) = repo.vacuum().await {
                    warn!(error = %e, "vacuum failed");
                } else {
                    info!("vacuum complete");
                }
            }
        }
    }
}

/// When VACUUM runs: at cron times (local) or at a fixed period.
#[derive(Debug, Clone)]
pub enum VacuumSchedule {
    Cron(Box<cron::Schedule>),
    Every(Duration),
}

impl VacuumSchedule {
    /// A cron expression takes precedence over the fixed interval.
    pub fn from_config(config: &MaintenanceWorkerConfig) -> Result<Self, cron::error::Error> {
        match config.vacuum_schedule.as_deref() {
            Some(expr) => Ok(Self::Cron(Box::new(cron::Schedule::from_str(expr)?))),
            None => Ok(Self::Every(Duration::from_secs(config.vacuum_interval_secs))),
        }
    }

    /// First VACUUM time strictly after `now`; `None` when a cron schedule has no
    /// future occurrence.
    pub fn next_after<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        match self {
            Self::Cron(schedule) => schedule.after(now).next(),
            Self::Every(period) => now
                .clone()
                .checked_add_signed(TimeDelta::from_std(*period).ok()?),
        }
    }
}

/// Sends a message on `tx` at each scheduled VACUUM time.
async fn vacuum_scheduler(config: MaintenanceWorkerConfig, tx: tokio::sync::mpsc::Sender<()>) {
    let schedule = match VacuumSchedule::from_config(&config) {
        Ok(schedule) => schedule,
        Err(e) => {
            warn!(error = %e, "invalid vacuum_schedule; VACUUM will not run");
            return;
        }
    };
    loop {
        let now = Local::now();
        let Some(next) = schedule.next_after(&now) else {
            warn!("vacuum schedule has no future run; VACUUM stops");
            return;
        };
        debug!(next_vacuum = %next.format("%Y-%m-%dT%H:%M:%S%:z"), "VACUUM scheduled");
        let delay = (next - now).to_std().unwrap_or(Duration::from_secs(1));
        tokio::time::sleep(delay).await;
        if tx.send(()).await.is_err() {
            break;
        }
    }
}

/// Runs one maintenance pass relative to `now`. Returns the number of pruned log rows.
pub async fn run_one_tick(repo: &ShipRepo, now: DateTime<Utc>) -> Result<u64, RepoError> {
    let pruned = repo.prune_old_logs(now).await?;
    if pruned > 0 {
        info!(pruned_rows = pruned, "pruned device logs past retention");
    } else {
        debug!("no device logs past retention");
    }
    Ok(pruned)
}

use serde::Deserialize;
use std::str::FromStr;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub path: String,
    pub max_pool_size: u32,
    /// Device logs older than this are pruned by the maintenance worker.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
    #[serde(default = "default_maintenance_interval_secs")]
    pub maintenance_interval_secs: u64,
    /// Optional cron expression for VACUUM (e.g. "0 0 3 * * *"). Uses local time.
    #[serde(default)]
    pub vacuum_schedule: Option<String>,
    /// Run VACUUM every N seconds when vacuum_schedule is not set.
    #[serde(default = "default_vacuum_interval_secs")]
    pub vacuum_interval_secs: u64,
}

fn default_retention_days() -> u32 {
    365
}

fn default_maintenance_interval_secs() -> u64 {
    3600
}

fn default_vacuum_interval_secs() -> u64 {
    86_400
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardConfig {
    /// Width of the sensor history shown on the ship page.
    #[serde(default = "default_history_window_hours")]
    pub history_window_hours: u32,
    /// Max log rows read per ship for one history request.
    #[serde(default = "default_history_limit")]
    pub history_limit: u32,
    /// Ship-local offset used for bucket boundaries; 0 = UTC.
    #[serde(default)]
    pub ship_utc_offset_minutes: i32,
}

fn default_history_window_hours() -> u32 {
    24
}

fn default_history_limit() -> u32 {
    10_000
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            history_window_hours: default_history_window_hours(),
            history_limit: default_history_limit(),
            ship_utc_offset_minutes: 0,
        }
    }
}

/// Largest real-world UTC offset (UTC+14).
const MAX_OFFSET_MINUTES: i32 = 14 * 60;

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(
            !self.database.path.is_empty(),
            "database.path must be non-empty"
        );
        anyhow::ensure!(
            self.database.max_pool_size > 0,
            "database.max_pool_size must be > 0, got {}",
            self.database.max_pool_size
        );
        anyhow::ensure!(
            self.database.retention_days > 0,
            "database.retention_days must be > 0, got {}",
            self.database.retention_days
        );
        anyhow::ensure!(
            self.database.maintenance_interval_secs > 0,
            "database.maintenance_interval_secs must be > 0, got {}",
            self.database.maintenance_interval_secs
        );
        anyhow::ensure!(
            self.database.vacuum_interval_secs > 0,
            "database.vacuum_interval_secs must be > 0, got {}",
            self.database.vacuum_interval_secs
        );
        if let Some(ref schedule) = self.database.vacuum_schedule {
            cron::Schedule::from_str(schedule).map_err(|e| {
                anyhow::anyhow!("database.vacuum_schedule is not a valid cron expression: {}", e)
            })?;
        }
        anyhow::ensure!(
            self.dashboard.history_window_hours > 0,
            "dashboard.history_window_hours must be > 0, got {}",
            self.dashboard.history_window_hours
        );
        anyhow::ensure!(
            self.dashboard.history_limit > 0,
            "dashboard.history_limit must be > 0, got {}",
            self.dashboard.history_limit
        );
        anyhow::ensure!(
            (-MAX_OFFSET_MINUTES..=MAX_OFFSET_MINUTES)
                .contains(&self.dashboard.ship_utc_offset_minutes),
            "dashboard.ship_utc_offset_minutes must be within ±{}, got {}",
            MAX_OFFSET_MINUTES,
            self.dashboard.ship_utc_offset_minutes
        );
        Ok(())
    }
}

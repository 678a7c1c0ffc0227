// SQLite store for ships, their devices and the devices' log rows.
// Log timestamps and readings stay TEXT as delivered; they are validated when
// turned into DeviceLogEntry values (see aggregation::parse_entry). SQLite's
// julianday() is used wherever the store itself has to order or compare them.

mod schema;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use sqlx::Row;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqlitePool, SqlitePoolOptions, SqliteRow,
};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;
use tracing::instrument;

use crate::aggregation::parse_entry;
use crate::models::{
    CorrosionStatus, DeviceLogEntry, DeviceStatusSet, MAX_DEVICES, NewLogRow, NewShip, RawLogRow,
    Ship, ShipStatus,
};

/// Rows scanned per device when looking for its latest readable log.
const LATEST_SCAN_ROWS: i64 = 16;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0} not found")]
    NotFound(String),
    #[error("{0} already exists")]
    Conflict(String),
    #[error("ship {imo} already has {max} devices", max = MAX_DEVICES)]
    DeviceLimit { imo: String },
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct ShipRepo {
    pool: SqlitePool,
    retention: TimeDelta,
}

impl ShipRepo {
    /// Connect to SQLite at `path`, create parent dir and DB if missing, enable WAL + pragmas.
    pub async fn connect(
        path: &str,
        max_pool_size: u32,
        retention_days: u32,
    ) -> Result<Self, RepoError> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_with(opts)
            .await?;
        Ok(Self {
            pool,
            retention: TimeDelta::days(i64::from(retention_days)),
        })
    }

    pub async fn init(&self) -> Result<(), RepoError> {
        schema::init_tables(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self, ship), fields(repo = "ship", operation = "create_ship", imo = %ship.imo))]
    pub async fn create_ship(&self, ship: &NewShip) -> Result<Ship, RepoError> {
        ship.validate().map_err(RepoError::Invalid)?;
        let status = ship.status.unwrap_or_default();
        let result = sqlx::query(
            r#"
            INSERT INTO ship
            (imo, ship_name, year_built, owner, owner_contact, location_from, location_to,
             coordinate_x, coordinate_y, status, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(&ship.imo)
        .bind(&ship.ship_name)
        .bind(ship.year_built)
        .bind(&ship.owner)
        .bind(&ship.owner_contact)
        .bind(&ship.location_from)
        .bind(&ship.location_to)
        .bind(ship.coordinate_x)
        .bind(ship.coordinate_y)
        .bind(status.as_str())
        .bind(ship.user_id)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(RepoError::Conflict(format!("ship {}", ship.imo)));
            }
            Err(e) => return Err(e.into()),
        }

        Ok(Ship {
            imo: ship.imo.clone(),
            ship_name: ship.ship_name.clone(),
            year_built: ship.year_built,
            owner: ship.owner.clone(),
            owner_contact: ship.owner_contact.clone(),
            location_from: ship.location_from.clone(),
            location_to: ship.location_to.clone(),
            coordinate_x: ship.coordinate_x,
            coordinate_y: ship.coordinate_y,
            status,
            user_id: ship.user_id,
        })
    }

    pub async fn get_ship(&self, imo: &str) -> Result<Ship, RepoError> {
        let row = sqlx::query(
            "SELECT imo, ship_name, year_built, owner, owner_contact, location_from, location_to,
                    coordinate_x, coordinate_y, status, user_id
             FROM ship WHERE imo = $1",
        )
        .bind(imo)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Err(RepoError::NotFound(format!("ship {}", imo)));
        };
        Self::parse_ship_row(&row)
    }

    /// Ships ordered by name; restricted to one owner account when `user_id` is given.
    #[instrument(skip(self), fields(repo = "ship", operation = "list_ships"))]
    pub async fn list_ships(&self, user_id: Option<i64>) -> Result<Vec<Ship>, RepoError> {
        const COLUMNS: &str = "SELECT imo, ship_name, year_built, owner, owner_contact, location_from, location_to,
                    coordinate_x, coordinate_y, status, user_id FROM ship";
        let rows = match user_id {
            Some(id) => {
                sqlx::query(&format!(
                    "{} WHERE user_id = $1 ORDER BY ship_name ASC",
                    COLUMNS
                ))
                .bind(id)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!("{} ORDER BY ship_name ASC", COLUMNS))
                    .fetch_all(&self.pool)
                    .await?
            }
        };
        rows.iter().map(Self::parse_ship_row).collect()
    }

    #[instrument(skip(self), fields(repo = "ship", operation = "update_ship_status"))]
    pub async fn update_ship_status(
        &self,
        imo: &str,
        status: ShipStatus,
    ) -> Result<Ship, RepoError> {
        let r = sqlx::query("UPDATE ship SET status = $1 WHERE imo = $2")
            .bind(status.as_str())
            .bind(imo)
            .execute(&self.pool)
            .await?;
        if r.rows_affected() == 0 {
            return Err(RepoError::NotFound(format!("ship {}", imo)));
        }
        self.get_ship(imo).await
    }

    /// Attach a device to a ship in the lowest free slot (1..=MAX_DEVICES). The slot
    /// is fixed for the device's lifetime and names its ship_monitor column.
    #[instrument(skip(self), fields(repo = "ship", operation = "register_device"))]
    pub async fn register_device(&self, imo: &str, device_id: &str) -> Result<usize, RepoError> {
        if device_id.trim().is_empty() {
            return Err(RepoError::Invalid("Missing field: deviceId".into()));
        }
        self.get_ship(imo).await?;

        let mut tx = self.pool.begin().await?;
        // Write first so the transaction holds the write lock before reading slots.
        sqlx::query("INSERT OR IGNORE INTO ship_monitor (id_ship) VALUES ($1)")
            .bind(imo)
            .execute(&mut *tx)
            .await?;
        let used: Vec<i64> = sqlx::query_scalar("SELECT slot FROM ship_device WHERE id_ship = $1")
            .bind(imo)
            .fetch_all(&mut *tx)
            .await?;
        let Some(slot) = (1..=MAX_DEVICES).find(|s| !used.contains(&(*s as i64))) else {
            return Err(RepoError::DeviceLimit {
                imo: imo.to_string(),
            });
        };
        let inserted =
            sqlx::query("INSERT INTO ship_device (device_id, id_ship, slot) VALUES ($1, $2, $3)")
                .bind(device_id)
                .bind(imo)
                .bind(slot as i64)
                .execute(&mut *tx)
                .await;
        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                return Err(RepoError::Conflict(format!("device {}", device_id)));
            }
            Err(e) => return Err(e.into()),
        }
        tx.commit().await?;
        Ok(slot)
    }

    /// Devices of a ship as `(slot, device_id)`, in slot order.
    pub async fn list_device_slots(&self, imo: &str) -> Result<Vec<(usize, String)>, RepoError> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT slot, device_id FROM ship_device WHERE id_ship = $1 ORDER BY slot ASC",
        )
        .bind(imo)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|(slot, device)| Ok((Self::checked_slot(slot, &device)?, device)))
            .collect()
    }

    /// Device ids of a ship in slot order.
    pub async fn list_devices(&self, imo: &str) -> Result<Vec<String>, RepoError> {
        Ok(self
            .list_device_slots(imo)
            .await?
            .into_iter()
            .map(|(_, device)| device)
            .collect())
    }

    /// Store one reading from a registered device and, when it is the device's newest,
    /// record its status label in the device's ship_monitor slot.
    #[instrument(skip(self, log), fields(repo = "ship", operation = "insert_log"))]
    pub async fn insert_log(&self, device_id: &str, log: &NewLogRow) -> Result<(), RepoError> {
        let (imo, slot) = sqlx::query_as::<_, (String, i64)>(
            "SELECT id_ship, slot FROM ship_device WHERE device_id = $1",
        )
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| RepoError::NotFound(format!("device {}", device_id)))?;
        let slot = Self::checked_slot(slot, device_id)?;

        let status = log
            .corrosion_status
            .as_deref()
            .and_then(CorrosionStatus::parse);
        let row = RawLogRow {
            device_id: device_id.to_string(),
            timestamp: log.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            corrosion_status: status.map(|s| s.as_str().to_string()),
            sensors: log.sensors().map(|v| v.map(|v| v.to_string())),
        };

        // Insert and slot refresh commit together; the NOT EXISTS guard keeps a late,
        // older reading from overwriting a newer label.
        let mut tx = self.pool.begin().await?;
        Self::insert_row(&mut tx, &row).await?;
        sqlx::query(&format!(
            "UPDATE ship_monitor SET device{} = $1
             WHERE id_ship = $2
               AND NOT EXISTS (
                   SELECT 1 FROM monitor_ship_log
                   WHERE device_id = $3 AND julianday(timestamp) > julianday($4)
               )",
            slot
        ))
        .bind(status.map(CorrosionStatus::as_str))
        .bind(&imo)
        .bind(device_id)
        .bind(&row.timestamp)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Store a row verbatim. Ingestion from other collectors and tests use this;
    /// nothing is validated here.
    pub async fn insert_raw_log(&self, row: &RawLogRow) -> Result<i64, RepoError> {
        let mut conn = self.pool.acquire().await?;
        Ok(Self::insert_row(&mut conn, row).await?)
    }

    async fn insert_row(conn: &mut SqliteConnection, row: &RawLogRow) -> Result<i64, sqlx::Error> {
        let [s1, s2, s3, s4] = &row.sensors;
        let r = sqlx::query(
            r#"
            INSERT INTO monitor_ship_log
            (device_id, timestamp, corrosion_status, sensor1, sensor2, sensor3, sensor4)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(&row.device_id)
        .bind(&row.timestamp)
        .bind(row.corrosion_status.as_deref())
        .bind(s1.as_deref())
        .bind(s2.as_deref())
        .bind(s3.as_deref())
        .bind(s4.as_deref())
        .execute(&mut *conn)
        .await?;
        Ok(r.last_insert_rowid())
    }

    /// Log rows of all devices of a ship with timestamps in `[from, to]`, newest first,
    /// at most `limit` of them. The SQL bound is padded by a second on each side; the
    /// aggregator applies the exact window. Rows SQLite cannot read a time from are
    /// never returned.
    #[instrument(skip(self), fields(repo = "ship", operation = "get_ship_logs"))]
    pub async fn get_ship_logs(
        &self,
        imo: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        limit: u32,
    ) -> Result<Vec<RawLogRow>, RepoError> {
        let pad = TimeDelta::seconds(1);
        let rows = sqlx::query(
            "SELECT l.device_id, l.timestamp, l.corrosion_status, l.sensor1, l.sensor2, l.sensor3, l.sensor4
             FROM monitor_ship_log l
             JOIN ship_device d ON l.device_id = d.device_id
             WHERE d.id_ship = $1
               AND julianday(l.timestamp) BETWEEN julianday($2) AND julianday($3)
             ORDER BY julianday(l.timestamp) DESC, l.id DESC
             LIMIT $4",
        )
        .bind(imo)
        .bind((from - pad).to_rfc3339_opts(SecondsFormat::Millis, true))
        .bind((to + pad).to_rfc3339_opts(SecondsFormat::Millis, true))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::parse_log_row).collect()
    }

    /// Newest readable log of one device, if any.
    pub async fn latest_log_for_device(
        &self,
        device_id: &str,
    ) -> Result<Option<DeviceLogEntry>, RepoError> {
        let rows = sqlx::query(
            "SELECT device_id, timestamp, corrosion_status, sensor1, sensor2, sensor3, sensor4
             FROM monitor_ship_log
             WHERE device_id = $1
             ORDER BY julianday(timestamp) DESC, id DESC
             LIMIT $2",
        )
        .bind(device_id)
        .bind(LATEST_SCAN_ROWS)
        .fetch_all(&self.pool)
        .await?;
        for row in &rows {
            match parse_entry(&Self::parse_log_row(row)?) {
                Ok(entry) => return Ok(Some(entry)),
                Err(e) => tracing::debug!(error = %e, device_id, "skipping unreadable log row"),
            }
        }
        Ok(None)
    }

    /// Latest status per registered device, in slot order, normalized to
    /// Low/Medium/High. `None` when the ship has no monitor row (no device ever registered).
    pub async fn get_device_statuses(
        &self,
        imo: &str,
    ) -> Result<Option<DeviceStatusSet>, RepoError> {
        let row = sqlx::query(
            "SELECT device1, device2, device3, device4 FROM ship_monitor WHERE id_ship = $1",
        )
        .bind(imo)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let mut labels = Vec::with_capacity(MAX_DEVICES);
        for (slot, device) in self.list_device_slots(imo).await? {
            let label: Option<String> = row.try_get(slot - 1)?;
            labels.push((device, label));
        }
        Ok(Some(DeviceStatusSet::from_labels(labels)))
    }

    /// Delete log rows older than the retention window, measured back from `now`.
    #[instrument(skip(self), fields(repo = "ship", operation = "prune_old_logs"))]
    pub async fn prune_old_logs(&self, now: DateTime<Utc>) -> Result<u64, RepoError> {
        let cutoff = (now - self.retention).to_rfc3339_opts(SecondsFormat::Millis, true);
        let r = sqlx::query(
            "DELETE FROM monitor_ship_log WHERE julianday(timestamp) < julianday($1)",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(r.rows_affected())
    }

    /// Reclaim space after deletes (run periodically after pruning).
    #[instrument(skip(self), fields(repo = "ship", operation = "vacuum"))]
    pub async fn vacuum(&self) -> Result<(), RepoError> {
        sqlx::query("VACUUM").execute(&self.pool).await?;
        Ok(())
    }

    fn checked_slot(slot: i64, device_id: &str) -> Result<usize, RepoError> {
        usize::try_from(slot)
            .ok()
            .filter(|s| (1..=MAX_DEVICES).contains(s))
            .ok_or_else(|| {
                RepoError::Invalid(format!("device {} has invalid slot {}", device_id, slot))
            })
    }

    fn parse_ship_row(row: &SqliteRow) -> Result<Ship, RepoError> {
        let status: String = row.try_get("status")?;
        Ok(Ship {
            imo: row.try_get("imo")?,
            ship_name: row.try_get("ship_name")?,
            year_built: row.try_get("year_built")?,
            owner: row.try_get("owner")?,
            owner_contact: row.try_get("owner_contact")?,
            location_from: row.try_get("location_from")?,
            location_to: row.try_get("location_to")?,
            coordinate_x: row.try_get("coordinate_x")?,
            coordinate_y: row.try_get("coordinate_y")?,
            status: ShipStatus::from_stored(&status),
            user_id: row.try_get("user_id")?,
        })
    }

    fn parse_log_row(row: &SqliteRow) -> Result<RawLogRow, RepoError> {
        Ok(RawLogRow {
            device_id: row.try_get("device_id")?,
            timestamp: row.try_get("timestamp")?,
            corrosion_status: row.try_get("corrosion_status")?,
            sensors: [
                row.try_get("sensor1")?,
                row.try_get("sensor2")?,
                row.try_get("sensor3")?,
                row.try_get("sensor4")?,
            ],
        })
    }
}

// Table definitions. Everything is CREATE IF NOT EXISTS so init() can run on every start.

use sqlx::SqlitePool;

pub(super) async fn init_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ship (
            imo TEXT PRIMARY KEY,
            ship_name TEXT NOT NULL,
            year_built INTEGER NOT NULL,
            owner TEXT NOT NULL,
            owner_contact TEXT NOT NULL,
            location_from TEXT NOT NULL,
            location_to TEXT NOT NULL,
            coordinate_x REAL NOT NULL,
            coordinate_y REAL NOT NULL,
            status TEXT NOT NULL DEFAULT 'Inactive',
            user_id INTEGER
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ship_device (
            device_id TEXT PRIMARY KEY,
            id_ship TEXT NOT NULL REFERENCES ship(imo) ON DELETE CASCADE,
            slot INTEGER NOT NULL CHECK (slot BETWEEN 1 AND 4),
            UNIQUE (id_ship, slot)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_ship_device_ship ON ship_device(id_ship)")
        .execute(pool)
        .await?;

    // Latest status label per device slot; deviceN holds the device registered in slot N.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS ship_monitor (
            id_ship TEXT PRIMARY KEY REFERENCES ship(imo) ON DELETE CASCADE,
            device1 TEXT,
            device2 TEXT,
            device3 TEXT,
            device4 TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Timestamps and readings are TEXT as delivered by devices; validated on read.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS monitor_ship_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            device_id TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            corrosion_status TEXT,
            sensor1 TEXT,
            sensor2 TEXT,
            sensor3 TEXT,
            sensor4 TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_log_device_timestamp ON monitor_ship_log(device_id, timestamp)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

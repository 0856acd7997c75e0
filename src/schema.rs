//! Database schema management for `airwatch-telemetry`.
//!
//! Ensures the `sensor_data` table, its upsert key and its read-path indexes
//! exist before the ingestion loop or any handler touches the store.
//! Applied once on startup from `main.rs`.

use anyhow::Result;
use sqlx::PgPool;

// ---

/// Create the database schema if it is missing (idempotent).
///
/// `sensor_data` holds one row per (`deviceid`, `timestamp`); the unique
/// constraint on that pair is what the ingestion upsert conflicts on. Safe to
/// call on every startup.
///
/// Errors are propagated if any SQL execution fails.
pub async fn create_schema(pool: &PgPool) -> Result<()> {
    // ---
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sensor_data (
            id            BIGSERIAL PRIMARY KEY,
            dvid          TEXT,
            deviceid      TEXT             NOT NULL,
            status        TEXT,
            latitude      DOUBLE PRECISION,
            longitude     DOUBLE PRECISION,
            place         TEXT,
            address       TEXT,
            model         TEXT,
            deploydate    TEXT,
            contactname   TEXT,
            contactphone  TEXT,
            note          TEXT,
            ddate         TEXT,
            dtime         TEXT,
            timestamp     BIGINT           NOT NULL,
            av24h         DOUBLE PRECISION,
            av12h         DOUBLE PRECISION,
            av6h          DOUBLE PRECISION,
            av3h          DOUBLE PRECISION,
            av1h          DOUBLE PRECISION,
            pm25          DOUBLE PRECISION,
            pm10          DOUBLE PRECISION,
            pm100         DOUBLE PRECISION,
            aqi           DOUBLE PRECISION,
            temperature   DOUBLE PRECISION,
            humidity      DOUBLE PRECISION,
            pres          DOUBLE PRECISION,
            color         TEXT,
            trend         TEXT,
            CONSTRAINT sensor_data_device_timestamp_key UNIQUE (deviceid, timestamp)
        );
        "#,
    )
    .execute(&mut *tx)
    .await?;

    // Window scans filter on timestamp
    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_data_timestamp
            ON sensor_data (timestamp);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        CREATE INDEX IF NOT EXISTS idx_sensor_data_address
            ON sensor_data (address);
        "#,
    )
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

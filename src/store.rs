//! Time-series store for sensor readings.
//!
//! [`SensorStore`] is the seam between the pipeline and PostgreSQL: the
//! fetcher writes through it and the engine reads through it. [`PgStore`] is
//! the production implementation. SQL structure is assembled only from the
//! fixed fragments in [`crate::engine::metric`] and [`Bucket::unit`]; every
//! request value is bound as a parameter.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::engine::metric::{GroupDimension, Metric, PROVINCE_EXPR};
use crate::engine::range::Bucket;
use crate::error::AppResult;
use crate::models::{AddressAverage, LatestReading, PlaceItem, ProvinceAverage, SensorReading};

// ---

/// Maximum number of rows returned by the places index.
pub const PLACES_LIMIT: i64 = 1000;

/// Parameters for a bucketed series query.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesQuery {
    /// Inclusive window bounds, epoch milliseconds.
    pub start_ms: i64,
    pub end_ms: i64,
    pub bucket: Bucket,
    pub metric: Metric,
    /// Case-insensitive substring matched against address or place. When
    /// set, rows are not grouped by province.
    pub filter: Option<String>,
    /// Keep the newest reading per bucket instead of averaging.
    pub latest_per_bucket: bool,
}

/// One (group, bucket) cell. `bucket` is Bangkok wall time.
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct BucketRow {
    pub grp: String,
    pub bucket: NaiveDateTime,
    pub value: Option<f64>,
}

/// Parameters for a grouped daily average.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupQuery {
    /// Half-open window `[start_ms, end_ms)`.
    pub start_ms: i64,
    pub end_ms: i64,
    pub metric: Metric,
    pub group: GroupDimension,
    pub limit: i64,
}

#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct GroupAverage {
    pub key: String,
    pub avg: Option<f64>,
    pub count: i64,
}

#[async_trait]
pub trait SensorStore: Send + Sync {
    /// Insert a reading, or overwrite every column of the existing row with
    /// the same (`deviceid`, `timestamp`).
    async fn upsert_reading(&self, reading: &SensorReading) -> AppResult<()>;

    async fn bucket_series(&self, query: &SeriesQuery) -> AppResult<Vec<BucketRow>>;

    /// Groups sorted by average descending (null averages last), blank keys
    /// excluded, zero readings ignored in the average.
    async fn group_averages(&self, query: &GroupQuery) -> AppResult<Vec<GroupAverage>>;

    async fn distinct_places(&self, filter: Option<&str>) -> AppResult<Vec<PlaceItem>>;

    async fn address_averages(&self, start_ms: i64, end_ms: i64) -> AppResult<Vec<AddressAverage>>;

    async fn province_averages(&self, start_ms: i64, end_ms: i64)
        -> AppResult<Vec<ProvinceAverage>>;

    async fn latest_reading(&self, filter: Option<&str>) -> AppResult<Option<LatestReading>>;

    async fn ping(&self) -> AppResult<()>;
}

/// Build an `ILIKE` pattern matching `needle` anywhere, with LIKE
/// metacharacters escaped.
pub fn contains_pattern(needle: &str) -> String {
    // ---
    let mut escaped = String::with_capacity(needle.len() + 2);
    escaped.push('%');
    for ch in needle.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

/// Bucket expression in Asia/Bangkok wall time.
fn bucket_expr(bucket: Bucket) -> String {
    format!(
        "date_trunc('{}', to_timestamp(timestamp / 1000.0) AT TIME ZONE 'Asia/Bangkok')",
        bucket.unit()
    )
}

fn series_sql(query: &SeriesQuery) -> String {
    // ---
    let grp = if query.filter.is_some() {
        "''::text"
    } else {
        PROVINCE_EXPR
    };
    let bucket = bucket_expr(query.bucket);
    let metric = query.metric.column();
    // Unfiltered charts drop rows with no derivable province, like ranking.
    let filter = if query.filter.is_some() {
        r"AND (address ILIKE $3 ESCAPE '\' OR place ILIKE $3 ESCAPE '\')".to_string()
    } else {
        format!("AND {PROVINCE_EXPR} <> ''")
    };

    if query.latest_per_bucket {
        format!(
            r#"
            SELECT DISTINCT ON (grp, bucket) grp, bucket, value
            FROM (
                SELECT {grp} AS grp,
                       {bucket} AS bucket,
                       {metric}::float8 AS value,
                       timestamp AS ts
                FROM sensor_data
                WHERE timestamp >= $1 AND timestamp <= $2
                  {filter}
            ) latest
            ORDER BY grp, bucket, ts DESC
            "#
        )
    } else {
        format!(
            r#"
            SELECT {grp} AS grp,
                   {bucket} AS bucket,
                   AVG({metric})::float8 AS value
            FROM sensor_data
            WHERE timestamp >= $1 AND timestamp <= $2
              {filter}
            GROUP BY 1, 2
            ORDER BY 1, 2
            "#
        )
    }
}

fn group_sql(query: &GroupQuery) -> String {
    // ---
    let key = query.group.expr();
    let metric = query.metric.column();
    format!(
        r#"
        SELECT {key} AS key,
               AVG(NULLIF({metric}, 0))::float8 AS avg,
               COUNT(*) AS count
        FROM sensor_data
        WHERE timestamp >= $1 AND timestamp < $2
          AND {key} IS NOT NULL
          AND TRIM({key}) <> ''
        GROUP BY 1
        ORDER BY avg DESC NULLS LAST, key ASC
        LIMIT $3
        "#
    )
}

fn places_sql(filtered: bool) -> String {
    // ---
    let filter = if filtered {
        r"AND address ILIKE $2 ESCAPE '\'"
    } else {
        ""
    };
    format!(
        r#"
        SELECT label, address, latitude, longitude, count
        FROM (
            SELECT COALESCE(NULLIF(TRIM(place), ''), NULLIF(TRIM(address), '')) AS label,
                   COALESCE(TRIM(address), '') AS address,
                   COALESCE(MAX(latitude), 0)::float8 AS latitude,
                   COALESCE(MAX(longitude), 0)::float8 AS longitude,
                   COUNT(*) AS count
            FROM sensor_data
            WHERE TRUE {filter}
            GROUP BY 1, 2
        ) places
        WHERE label IS NOT NULL
        ORDER BY count DESC, label ASC
        LIMIT $1
        "#
    )
}

// ---

/// PostgreSQL-backed store.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SensorStore for PgStore {
    // ---
    async fn upsert_reading(&self, reading: &SensorReading) -> AppResult<()> {
        // ---
        sqlx::query(
            r#"
            INSERT INTO sensor_data (
                dvid, deviceid, status, latitude, longitude, place, address, model,
                deploydate, contactname, contactphone, note, ddate, dtime, timestamp,
                av24h, av12h, av6h, av3h, av1h, pm25, pm10, pm100, aqi,
                temperature, humidity, pres, color, trend
            ) VALUES (
                $1, $2, $3, $4, $5, $6, $7, $8,
                $9, $10, $11, $12, $13, $14, $15,
                $16, $17, $18, $19, $20, $21, $22, $23, $24,
                $25, $26, $27, $28, $29
            )
            ON CONFLICT (deviceid, timestamp) DO UPDATE SET
                dvid = EXCLUDED.dvid,
                status = EXCLUDED.status,
                latitude = EXCLUDED.latitude,
                longitude = EXCLUDED.longitude,
                place = EXCLUDED.place,
                address = EXCLUDED.address,
                model = EXCLUDED.model,
                deploydate = EXCLUDED.deploydate,
                contactname = EXCLUDED.contactname,
                contactphone = EXCLUDED.contactphone,
                note = EXCLUDED.note,
                ddate = EXCLUDED.ddate,
                dtime = EXCLUDED.dtime,
                av24h = EXCLUDED.av24h,
                av12h = EXCLUDED.av12h,
                av6h = EXCLUDED.av6h,
                av3h = EXCLUDED.av3h,
                av1h = EXCLUDED.av1h,
                pm25 = EXCLUDED.pm25,
                pm10 = EXCLUDED.pm10,
                pm100 = EXCLUDED.pm100,
                aqi = EXCLUDED.aqi,
                temperature = EXCLUDED.temperature,
                humidity = EXCLUDED.humidity,
                pres = EXCLUDED.pres,
                color = EXCLUDED.color,
                trend = EXCLUDED.trend
            "#,
        )
        .bind(&reading.dvid)
        .bind(&reading.deviceid)
        .bind(&reading.status)
        .bind(reading.latitude)
        .bind(reading.longitude)
        .bind(&reading.place)
        .bind(&reading.address)
        .bind(&reading.model)
        .bind(&reading.deploydate)
        .bind(&reading.contactname)
        .bind(&reading.contactphone)
        .bind(&reading.note)
        .bind(&reading.ddate)
        .bind(&reading.dtime)
        .bind(reading.timestamp)
        .bind(reading.av24h)
        .bind(reading.av12h)
        .bind(reading.av6h)
        .bind(reading.av3h)
        .bind(reading.av1h)
        .bind(reading.pm25)
        .bind(reading.pm10)
        .bind(reading.pm100)
        .bind(reading.aqi)
        .bind(reading.temperature)
        .bind(reading.humidity)
        .bind(reading.pres)
        .bind(&reading.color)
        .bind(&reading.trend)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn bucket_series(&self, query: &SeriesQuery) -> AppResult<Vec<BucketRow>> {
        // ---
        let sql = series_sql(query);
        let mut q = sqlx::query_as::<_, BucketRow>(&sql)
            .bind(query.start_ms)
            .bind(query.end_ms);
        if let Some(filter) = &query.filter {
            q = q.bind(contains_pattern(filter));
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn group_averages(&self, query: &GroupQuery) -> AppResult<Vec<GroupAverage>> {
        // ---
        let sql = group_sql(query);
        let rows = sqlx::query_as::<_, GroupAverage>(&sql)
            .bind(query.start_ms)
            .bind(query.end_ms)
            .bind(query.limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn distinct_places(&self, filter: Option<&str>) -> AppResult<Vec<PlaceItem>> {
        // ---
        let where_clause = if filter.is_some() {
            r"WHERE address ILIKE $2 ESCAPE '\'"
        } else {
            ""
        };
        let sql = format!(
            r#"
            SELECT COALESCE(NULLIF(TRIM(place), ''), address, '') AS label,
                   COALESCE(address, '') AS address,
                   COALESCE(MAX(latitude), 0)::float8 AS latitude,
                   COALESCE(MAX(longitude), 0)::float8 AS longitude,
                   COUNT(*) AS count
            FROM sensor_data
            {where_clause}
            GROUP BY 1, 2
            ORDER BY count DESC, label ASC
            LIMIT $1
            "#
        );

        let mut q = sqlx::query_as::<_, PlaceItem>(&sql).bind(PLACES_LIMIT);
        if let Some(filter) = filter {
            q = q.bind(contains_pattern(filter));
        }
        Ok(q.fetch_all(&self.pool).await?)
    }

    async fn address_averages(&self, start_ms: i64, end_ms: i64) -> AppResult<Vec<AddressAverage>> {
        // ---
        let rows = sqlx::query_as::<_, AddressAverage>(
            r#"
            SELECT COALESCE(address, '') AS address,
                   COALESCE(AVG(pm25), 0)::float8 AS avg_pm25,
                   COALESCE(AVG(pm10), 0)::float8 AS avg_pm10
            FROM sensor_data
            WHERE timestamp BETWEEN $1 AND $2
            GROUP BY 1
            ORDER BY 1
            "#,
        )
        .bind(start_ms)
        .bind(end_ms)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn province_averages(
        &self,
        start_ms: i64,
        end_ms: i64,
    ) -> AppResult<Vec<ProvinceAverage>> {
        // ---
        let sql = format!(
            r#"
            WITH province_data AS (
                SELECT {PROVINCE_EXPR} AS province, deviceid, pm25
                FROM sensor_data
                WHERE timestamp BETWEEN $1 AND $2
            )
            SELECT province,
                   COALESCE(ROUND(AVG(pm25)::numeric, 2), 0)::float8 AS avg_pm25,
                   COUNT(DISTINCT deviceid) AS station_count
            FROM province_data
            WHERE province <> ''
            GROUP BY province
            ORDER BY avg_pm25 DESC, province ASC
            "#
        );
        let rows = sqlx::query_as::<_, ProvinceAverage>(&sql)
            .bind(start_ms)
            .bind(end_ms)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn latest_reading(&self, filter: Option<&str>) -> AppResult<Option<LatestReading>> {
        // ---
        let where_clause = if filter.is_some() {
            r"WHERE address ILIKE $1 ESCAPE '\'"
        } else {
            ""
        };
        let sql = format!(
            r#"
            SELECT COALESCE(aqi, 0)::float8 AS aqi,
                   COALESCE(pm25, 0)::float8 AS pm25,
                   timestamp,
                   COALESCE(address, '') AS address,
                   COALESCE(place, '') AS place
            FROM sensor_data
            {where_clause}
            ORDER BY timestamp DESC
            LIMIT 1
            "#
        );

        let mut q = sqlx::query_as::<_, LatestReading>(&sql);
        if let Some(filter) = filter {
            q = q.bind(contains_pattern(filter));
        }
        Ok(q.fetch_optional(&self.pool).await?)
    }

    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

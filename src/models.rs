//! Data models for the air-quality pipeline.
//!
//! Raw upstream rows are decoded leniently into [`RawSensorReading`] and then
//! checked into a [`SensorReading`] before they reach the store. The rest of
//! the types are read-path results serialized straight to the dashboard.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

// ---

/// Envelope returned by the upstream device API.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope {
    // ---
    #[serde(default)]
    pub status: serde_json::Value,
    #[serde(default)]
    pub error: serde_json::Value,
    /// Rows are kept as raw JSON so one malformed row cannot fail the batch.
    pub response: Vec<serde_json::Value>,
}

/// Raw sensor row as published upstream. Every field is optional here;
/// [`RawSensorReading::to_reading`] enforces the key columns.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RawSensorReading {
    // ---
    pub dvid: Option<String>,
    pub deviceid: Option<String>,
    pub status: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub place: Option<String>,
    pub address: Option<String>,
    pub model: Option<String>,
    pub deploydate: Option<String>,
    pub contactname: Option<String>,
    pub contactphone: Option<String>,
    pub note: Option<String>,
    pub ddate: Option<String>,
    pub dtime: Option<String>,
    pub timestamp: Option<i64>,
    pub av24h: Option<f64>,
    pub av12h: Option<f64>,
    pub av6h: Option<f64>,
    pub av3h: Option<f64>,
    pub av1h: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub pm100: Option<f64>,
    pub aqi: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pres: Option<f64>,
    pub color: Option<String>,
    pub trend: Option<String>,
}

/// A validated reading, one row of `sensor_data` keyed by
/// (`deviceid`, `timestamp`).
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct SensorReading {
    // ---
    pub dvid: Option<String>,
    pub deviceid: String,
    pub status: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub place: Option<String>,
    pub address: Option<String>,
    pub model: Option<String>,
    pub deploydate: Option<String>,
    pub contactname: Option<String>,
    pub contactphone: Option<String>,
    pub note: Option<String>,
    pub ddate: Option<String>,
    pub dtime: Option<String>,
    /// Epoch milliseconds.
    pub timestamp: i64,
    pub av24h: Option<f64>,
    pub av12h: Option<f64>,
    pub av6h: Option<f64>,
    pub av3h: Option<f64>,
    pub av1h: Option<f64>,
    pub pm25: Option<f64>,
    pub pm10: Option<f64>,
    pub pm100: Option<f64>,
    pub aqi: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pres: Option<f64>,
    pub color: Option<String>,
    pub trend: Option<String>,
}

impl RawSensorReading {
    // ---
    /// Check the key columns and produce a storable reading.
    ///
    /// Rejects rows without a non-blank `deviceid` or a positive `timestamp`;
    /// those columns are `NOT NULL` and form the upsert key.
    pub fn to_reading(self) -> AppResult<SensorReading> {
        // ---
        let deviceid = self
            .deviceid
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| AppError::validation("reading has no deviceid"))?;

        let timestamp = self
            .timestamp
            .filter(|ts| *ts > 0)
            .ok_or_else(|| {
                AppError::validation(format!("reading for {deviceid} has no valid timestamp"))
            })?;

        Ok(SensorReading {
            dvid: self.dvid,
            deviceid,
            status: self.status,
            latitude: self.latitude,
            longitude: self.longitude,
            place: self.place,
            address: self.address,
            model: self.model,
            deploydate: self.deploydate,
            contactname: self.contactname,
            contactphone: self.contactphone,
            note: self.note,
            ddate: self.ddate,
            dtime: self.dtime,
            timestamp,
            av24h: self.av24h,
            av12h: self.av12h,
            av6h: self.av6h,
            av3h: self.av3h,
            av1h: self.av1h,
            pm25: self.pm25,
            pm10: self.pm10,
            pm100: self.pm100,
            aqi: self.aqi,
            temperature: self.temperature,
            humidity: self.humidity,
            pres: self.pres,
            color: self.color,
            trend: self.trend,
        })
    }
}

/// Chart payload: a shared label axis plus one series per group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChartSeries {
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankRow {
    /// Address, place or derived province depending on `group`.
    pub key: String,
    pub avg: f64,
    pub rank: u32,
    pub count: i64,
    pub date: String,
    pub metric: String,
    pub group: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlaceItem {
    pub label: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AddressAverage {
    pub address: String,
    pub avg_pm25: f64,
    pub avg_pm10: f64,
}

/// Per-address averages over a rolling window ending now.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingAverages {
    pub current_date: DateTime<Utc>,
    pub past_date: DateTime<Utc>,
    pub data: Vec<AddressAverage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ProvinceAverage {
    pub province: String,
    pub avg_pm25: f64,
    pub station_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct LatestReading {
    pub aqi: f64,
    pub pm25: f64,
    pub timestamp: i64,
    pub address: String,
    pub place: String,
}

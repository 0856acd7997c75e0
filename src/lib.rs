//! Air-quality telemetry backend.
//!
//! Two decoupled flows share one PostgreSQL table:
//! - [`ingest`] polls the upstream device feed and upserts readings keyed by
//!   (device, timestamp);
//! - [`routes`] serves rolling-window aggregates computed by [`engine`],
//!   fronted by the short-TTL [`cache`].
//!
//! Collaborators (store, cache, clock, HTTP client) are passed in explicitly;
//! there is no global state.

pub mod cache;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod ingest;
pub mod models;
pub mod routes;
pub mod schema;
pub mod store;

#[cfg(test)]
pub(crate) mod fake;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{ChartSeries, RawSensorReading, SensorReading};

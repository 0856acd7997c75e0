//! Configuration loader for the `airwatch-telemetry` backend service.
//!
//! This module centralizes all runtime configuration values and their defaults,
//! loading from environment variables (with optional `.env` file support
//! provided by the caller), so `env::var` calls are not scattered through the
//! ingestion and read paths.
use std::{env, time::Duration};

use anyhow::{anyhow, Result};

use crate::cache::DEFAULT_CACHE_CAPACITY;
use crate::ingest::DEFAULT_MAX_FEED_BYTES;

/// Parse an optional numeric environment variable with a default value.
macro_rules! parse_env {
    ($var_name:expr, $ty:ty, $default:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().parse::<$ty>())
            .transpose()
            .map_err(|e| anyhow!("Invalid {}: {}", $var_name, e))?
            .unwrap_or($default)
    };
}

/// Parse a required string environment variable.
macro_rules! require_env {
    ($var_name:expr) => {
        env::var($var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| anyhow!("{} must be set in .env or environment", $var_name))?
    };
}

/// Strongly typed application configuration.
///
/// All fields are immutable after loading, ensuring a consistent configuration
/// snapshot for the lifetime of the application.
#[derive(Debug, Clone)]
pub struct Config {
    // ---
    /// PostgreSQL connection string.
    pub db_url: String,

    /// Maximum number of database connections in the pool.
    pub db_pool_max: u32,

    /// Upstream device feed polled by the ingestion loop.
    pub api_url: String,

    /// TCP port the HTTP server binds on all interfaces.
    pub listen_port: u16,

    /// Period between ingestion cycles.
    pub ingest_interval: Duration,

    /// Upper bound on a single upstream fetch.
    pub fetch_timeout: Duration,

    /// Largest upstream response body accepted, in bytes.
    pub fetch_max_bytes: usize,

    /// Maximum number of cached aggregate responses.
    pub cache_capacity: u64,
}

/// Load configuration from environment variables with defaults.
///
/// Required:
/// - `DATABASE_URL` – PostgreSQL connection string
/// - `SENSOR_API_URL` – upstream device feed URL
///
/// Optional:
/// - `DB_POOL_MAX` – max DB connections (default: 5)
/// - `LISTEN_PORT` – HTTP port (default: 8080)
/// - `INGEST_INTERVAL_SECS` – seconds between polls (default: 300)
/// - `FETCH_TIMEOUT_SECS` – upstream request timeout (default: 15)
/// - `FETCH_MAX_BYTES` – upstream body size limit (default: 32 MiB)
/// - `CACHE_CAPACITY` – cached responses kept in memory (default: 10000)
///
/// Returns an error if any required variable is missing or invalid.
pub fn load_from_env() -> Result<Config> {
    // ---
    let db_url = require_env!("DATABASE_URL");
    let api_url = require_env!("SENSOR_API_URL");
    let db_pool_max = parse_env!("DB_POOL_MAX", u32, 5);
    let listen_port = parse_env!("LISTEN_PORT", u16, 8080);
    let ingest_secs = parse_env!("INGEST_INTERVAL_SECS", u64, 300);
    let fetch_timeout_secs = parse_env!("FETCH_TIMEOUT_SECS", u64, 15);
    let fetch_max_bytes = parse_env!("FETCH_MAX_BYTES", usize, DEFAULT_MAX_FEED_BYTES);
    let cache_capacity = parse_env!("CACHE_CAPACITY", u64, DEFAULT_CACHE_CAPACITY);

    if ingest_secs == 0 {
        return Err(anyhow!("INGEST_INTERVAL_SECS must be greater than zero"));
    }
    if fetch_timeout_secs == 0 {
        return Err(anyhow!("FETCH_TIMEOUT_SECS must be greater than zero"));
    }
    if fetch_max_bytes == 0 {
        return Err(anyhow!("FETCH_MAX_BYTES must be greater than zero"));
    }

    Ok(Config {
        db_url,
        db_pool_max,
        api_url,
        listen_port,
        ingest_interval: Duration::from_secs(ingest_secs),
        fetch_timeout: Duration::from_secs(fetch_timeout_secs),
        fetch_max_bytes,
        cache_capacity,
    })
}

impl Config {
    /// Database URL with the password replaced by `****`.
    pub fn masked_db_url(&self) -> String {
        // ---
        let scheme_end = self.db_url.find("://").map_or(0, |p| p + 3);
        if let Some(at_pos) = self.db_url.rfind('@').filter(|&p| p > scheme_end) {
            if let Some(colon) = self.db_url[scheme_end..at_pos].find(':') {
                let colon_pos = scheme_end + colon;
                return format!("{}:****{}", &self.db_url[..colon_pos], &self.db_url[at_pos..]);
            }
        }
        self.db_url.clone()
    }

    /// Log the loaded configuration for debugging purposes.
    ///
    /// Masks the database password while showing all configuration values
    /// that were loaded.
    pub fn log_config(&self) {
        // ---
        tracing::info!("Configuration loaded:");
        tracing::info!("  DATABASE_URL         : {}", self.masked_db_url());
        tracing::info!("  SENSOR_API_URL       : {}", self.api_url);
        tracing::info!("  DB_POOL_MAX          : {}", self.db_pool_max);
        tracing::info!("  LISTEN_PORT          : {}", self.listen_port);
        tracing::info!("  INGEST_INTERVAL_SECS : {}", self.ingest_interval.as_secs());
        tracing::info!("  FETCH_TIMEOUT_SECS   : {}", self.fetch_timeout.as_secs());
        tracing::info!("  FETCH_MAX_BYTES      : {}", self.fetch_max_bytes);
        tracing::info!("  CACHE_CAPACITY       : {}", self.cache_capacity);
    }
}

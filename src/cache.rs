//! Short-TTL JSON cache in front of the aggregation engine.
//!
//! Entries carry their own TTL, chosen per endpoint granularity: near
//! real-time views expire in seconds, yearly aggregates in hours. Expiry is
//! checked against the injected [`Clock`], so an entry is a hit strictly
//! before `stored_at + ttl` and a miss from then on.
//!
//! Caching is an optimisation only. [`read_through`] logs and ignores every
//! cache failure and falls back to computing the value.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use moka::future::Cache;
use moka::Expiry;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::engine::range::RangeKind;
use crate::error::{AppError, AppResult};

/// Default cache capacity (number of entries).
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

#[async_trait]
pub trait JsonCache: Send + Sync {
    /// Serialized value for `key`, or `None` on miss or expiry.
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>>;

    async fn set_raw(&self, key: &str, json: String, ttl: Duration) -> AppResult<()>;
}

/// Look up and decode a JSON value.
pub async fn get_json<T: DeserializeOwned>(cache: &dyn JsonCache, key: &str) -> AppResult<Option<T>> {
    // ---
    match cache.get_raw(key).await? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| AppError::Cache(format!("corrupt entry {key}: {e}"))),
        None => Ok(None),
    }
}

pub async fn set_json<T: Serialize>(
    cache: &dyn JsonCache,
    key: &str,
    value: &T,
    ttl: Duration,
) -> AppResult<()> {
    // ---
    let json = serde_json::to_string(value)
        .map_err(|e| AppError::Cache(format!("serialize {key}: {e}")))?;
    cache.set_raw(key, json, ttl).await
}

/// Serve `key` from the cache, or compute it and store it best-effort.
///
/// Cache read errors behave like a miss and write errors are only logged.
/// Errors from `compute` propagate and nothing is cached for them.
pub async fn read_through<T, F, Fut>(
    cache: &dyn JsonCache,
    key: &str,
    ttl: Duration,
    compute: F,
) -> AppResult<T>
where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    // ---
    match get_json::<T>(cache, key).await {
        Ok(Some(value)) => {
            debug!(key = %key, "cache hit");
            return Ok(value);
        }
        Ok(None) => debug!(key = %key, "cache miss"),
        Err(e) => warn!(key = %key, error = %e, "cache read failed, computing"),
    }

    let value = compute().await?;

    if let Err(e) = set_json(cache, key, &value, ttl).await {
        warn!(key = %key, error = %e, "cache write failed");
    }
    Ok(value)
}

// ---

#[derive(Debug, Clone)]
struct CacheEntry {
    json: String,
    expires_at: DateTime<Utc>,
    ttl: Duration,
}

/// Lets moka reclaim entries on its own schedule; correctness comes from
/// the clock check in [`MemoryCache::get_raw`].
struct EntryTtl;

impl Expiry<String, CacheEntry> for EntryTtl {
    fn expire_after_create(&self, _key: &String, value: &CacheEntry, _created_at: Instant) -> Option<Duration> {
        Some(value.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(value.ttl)
    }
}

/// In-process cache backed by moka with per-entry TTLs.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Cache<String, CacheEntry>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    // ---
    pub fn new(capacity: u64, clock: Arc<dyn Clock>) -> Self {
        let inner = Cache::builder()
            .max_capacity(capacity)
            .expire_after(EntryTtl)
            .build();
        Self { inner, clock }
    }
}

#[async_trait]
impl JsonCache for MemoryCache {
    // ---
    async fn get_raw(&self, key: &str) -> AppResult<Option<String>> {
        // ---
        let Some(entry) = self.inner.get(key).await else {
            return Ok(None);
        };
        if self.clock.now() >= entry.expires_at {
            self.inner.invalidate(key).await;
            return Ok(None);
        }
        Ok(Some(entry.json))
    }

    async fn set_raw(&self, key: &str, json: String, ttl: Duration) -> AppResult<()> {
        // ---
        let ttl_chrono = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::Cache(format!("ttl out of range: {e}")))?;
        let entry = CacheEntry {
            json,
            expires_at: self.clock.now() + ttl_chrono,
            ttl,
        };
        self.inner.insert(key.to_string(), entry).await;
        Ok(())
    }
}

/// Cache keys. Every resolved parameter is part of the key, so distinct
/// parameter combinations never share an entry.
pub mod keys {
    // ---
    use crate::engine::metric::Metric;
    use crate::engine::range::RangeKind;

    pub fn chart(range: RangeKind, province: &str, metric: Metric) -> String {
        format!("chart:data:{}:{}:{}", range.keyword(), province, metric.name())
    }

    pub fn heatmap(province: &str, metric: Metric) -> String {
        format!("chart:heatmap:1y:{}:{}", province, metric.name())
    }

    pub fn places(province: &str) -> String {
        format!("places:{province}")
    }

    pub fn rolling(window: &str) -> String {
        format!("airquality:{window}")
    }

    pub const PROVINCE_AVERAGE: &str = "airquality:province_average";
}

/// TTLs per endpoint.
pub mod ttl {
    // ---
    use std::time::Duration;

    pub const HEATMAP: Duration = Duration::from_secs(6 * 3600);
    pub const RANKING: Duration = Duration::from_secs(30 * 60);
    pub const PLACES: Duration = Duration::from_secs(30 * 60);
    pub const ROLLING: Duration = Duration::from_secs(5 * 60);
    pub const PROVINCE_AVERAGE: Duration = Duration::from_secs(60);
}

/// TTL for a range-based chart.
pub fn chart_ttl(range: RangeKind) -> Duration {
    // ---
    match range {
        RangeKind::Today | RangeKind::Last24Hours => Duration::from_secs(30),
        RangeKind::OneWeek => Duration::from_secs(60),
        RangeKind::OneMonth => Duration::from_secs(3 * 60),
        RangeKind::ThreeMonths | RangeKind::OneYear => Duration::from_secs(10 * 60),
        RangeKind::HeatmapYear => ttl::HEATMAP,
    }
}

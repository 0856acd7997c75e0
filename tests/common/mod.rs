//! Shared harness for integration tests: a scripted in-memory store and a
//! router wired the same way `main.rs` wires it.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use airwatch::cache::MemoryCache;
use airwatch::clock::{Clock, ManualClock};
use airwatch::engine::Engine;
use airwatch::error::{AppError, AppResult};
use airwatch::ingest::Fetcher;
use airwatch::models::{AddressAverage, LatestReading, PlaceItem, ProvinceAverage, SensorReading};
use airwatch::routes::{self, AppState};
use airwatch::store::{BucketRow, GroupAverage, GroupQuery, SensorStore, SeriesQuery};

// ---

/// Fixed "now" for HTTP tests: 2023-11-15 00:00 UTC, 07:00 in Bangkok.
pub fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 11, 15, 0, 0, 0).unwrap()
}

#[derive(Default)]
struct Script {
    series: Vec<BucketRow>,
    groups: Vec<GroupAverage>,
    latest: Option<LatestReading>,
    series_calls: usize,
    group_calls: usize,
    last_series: Option<SeriesQuery>,
    fail: bool,
}

/// Store returning canned rows and counting read calls.
#[derive(Default)]
pub struct ScriptedStore {
    script: Mutex<Script>,
}

impl ScriptedStore {
    // ---
    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn with_series(self, rows: Vec<BucketRow>) -> Self {
        self.script().series = rows;
        self
    }

    pub fn with_groups(self, rows: Vec<GroupAverage>) -> Self {
        self.script().groups = rows;
        self
    }

    pub fn with_latest(self, latest: LatestReading) -> Self {
        self.script().latest = Some(latest);
        self
    }

    pub fn failing(self) -> Self {
        self.script().fail = true;
        self
    }

    pub fn series_calls(&self) -> usize {
        self.script().series_calls
    }

    pub fn group_calls(&self) -> usize {
        self.script().group_calls
    }

    pub fn last_series_query(&self) -> Option<SeriesQuery> {
        self.script().last_series.clone()
    }

    fn check(&self) -> AppResult<()> {
        if self.script().fail {
            return Err(AppError::Store(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl SensorStore for ScriptedStore {
    // ---
    async fn upsert_reading(&self, _reading: &SensorReading) -> AppResult<()> {
        self.check()
    }

    async fn bucket_series(&self, query: &SeriesQuery) -> AppResult<Vec<BucketRow>> {
        self.check()?;
        let mut script = self.script();
        script.series_calls += 1;
        script.last_series = Some(query.clone());
        Ok(script.series.clone())
    }

    async fn group_averages(&self, _query: &GroupQuery) -> AppResult<Vec<GroupAverage>> {
        self.check()?;
        let mut script = self.script();
        script.group_calls += 1;
        Ok(script.groups.clone())
    }

    async fn distinct_places(&self, _filter: Option<&str>) -> AppResult<Vec<PlaceItem>> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn address_averages(&self, _start_ms: i64, _end_ms: i64) -> AppResult<Vec<AddressAverage>> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn province_averages(
        &self,
        _start_ms: i64,
        _end_ms: i64,
    ) -> AppResult<Vec<ProvinceAverage>> {
        self.check()?;
        Ok(Vec::new())
    }

    async fn latest_reading(&self, _filter: Option<&str>) -> AppResult<Option<LatestReading>> {
        self.check()?;
        Ok(self.script().latest.clone())
    }

    async fn ping(&self) -> AppResult<()> {
        self.check()
    }
}

/// Router over `store` with a manual clock at [`fixed_now`].
pub fn app(store: Arc<dyn SensorStore>) -> (axum::Router, Arc<ManualClock>) {
    // ---
    let clock = Arc::new(ManualClock::new(fixed_now()));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let state = AppState {
        engine: Arc::new(Engine::new(store.clone(), dyn_clock.clone())),
        cache: Arc::new(MemoryCache::new(1_000, dyn_clock)),
        fetcher: Arc::new(Fetcher::new(store, Duration::from_secs(2)).unwrap()),
        source_url: "http://127.0.0.1:9/feed".to_string(),
    };
    (routes::router(state), clock)
}

//! In-memory [`SensorStore`] used by unit tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, AppResult};
use crate::models::{AddressAverage, LatestReading, PlaceItem, ProvinceAverage, SensorReading};
use crate::store::{BucketRow, GroupAverage, GroupQuery, SensorStore, SeriesQuery};

#[derive(Default)]
pub struct FakeStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    rows: BTreeMap<(String, i64), SensorReading>,
    rejected_devices: HashSet<String>,
    series: Vec<BucketRow>,
    groups: Vec<GroupAverage>,
    series_queries: Vec<SeriesQuery>,
    group_queries: Vec<GroupQuery>,
    fail_reads: bool,
}

impl FakeStore {
    // ---
    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|err| err.into_inner())
    }

    /// Upserts for this device fail like a constraint violation would.
    pub fn reject_device(&self, deviceid: &str) {
        self.state().rejected_devices.insert(deviceid.to_string());
    }

    pub fn fail_reads(&self) {
        self.state().fail_reads = true;
    }

    pub fn set_series(&self, rows: Vec<BucketRow>) {
        self.state().series = rows;
    }

    pub fn set_groups(&self, rows: Vec<GroupAverage>) {
        self.state().groups = rows;
    }

    pub fn rows(&self) -> Vec<SensorReading> {
        self.state().rows.values().cloned().collect()
    }

    pub fn series_queries(&self) -> Vec<SeriesQuery> {
        self.state().series_queries.clone()
    }

    pub fn group_queries(&self) -> Vec<GroupQuery> {
        self.state().group_queries.clone()
    }

    fn check_reads(&self) -> AppResult<()> {
        if self.state().fail_reads {
            return Err(AppError::Store(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl SensorStore for FakeStore {
    // ---
    async fn upsert_reading(&self, reading: &SensorReading) -> AppResult<()> {
        let mut state = self.state();
        if state.rejected_devices.contains(&reading.deviceid) {
            return Err(AppError::Store(sqlx::Error::Protocol(format!(
                "rejected {}",
                reading.deviceid
            ))));
        }
        state
            .rows
            .insert((reading.deviceid.clone(), reading.timestamp), reading.clone());
        Ok(())
    }

    async fn bucket_series(&self, query: &SeriesQuery) -> AppResult<Vec<BucketRow>> {
        self.check_reads()?;
        let mut state = self.state();
        state.series_queries.push(query.clone());
        Ok(state.series.clone())
    }

    async fn group_averages(&self, query: &GroupQuery) -> AppResult<Vec<GroupAverage>> {
        self.check_reads()?;
        let mut state = self.state();
        state.group_queries.push(query.clone());
        Ok(state.groups.clone())
    }

    async fn distinct_places(&self, _filter: Option<&str>) -> AppResult<Vec<PlaceItem>> {
        self.check_reads()?;
        Ok(Vec::new())
    }

    async fn address_averages(&self, _start_ms: i64, _end_ms: i64) -> AppResult<Vec<AddressAverage>> {
        self.check_reads()?;
        Ok(Vec::new())
    }

    async fn province_averages(&self, _start_ms: i64, _end_ms: i64) -> AppResult<Vec<ProvinceAverage>> {
        self.check_reads()?;
        Ok(Vec::new())
    }

    async fn latest_reading(&self, _filter: Option<&str>) -> AppResult<Option<LatestReading>> {
        self.check_reads()?;
        Ok(None)
    }

    async fn ping(&self) -> AppResult<()> {
        self.check_reads()
    }
}

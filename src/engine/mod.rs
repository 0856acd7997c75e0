//! Aggregation engine: rolling-window series, heatmaps, daily rankings and
//! the smaller read-side lookups, all computed against a [`SensorStore`].
//!
//! The engine owns no state beyond its injected store and clock, so one
//! instance is shared by every request handler.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::clock::{bangkok, Clock};
use crate::error::{AppError, AppResult};
use crate::models::{ChartSeries, LatestReading, PlaceItem, ProvinceAverage, RankRow, RollingAverages};
use crate::store::{GroupQuery, SensorStore, SeriesQuery};

pub mod metric;
pub mod range;
pub mod rank;
pub mod series;

use metric::Metric;
use range::RangeKind;
use rank::RankRequest;

// ---

/// Rolling windows served by the per-address averages endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollingWindow {
    OneDay,
    OneWeek,
    OneMonth,
    ThreeMonths,
    OneYear,
}

impl RollingWindow {
    // ---
    pub fn parse(input: &str) -> AppResult<RollingWindow> {
        match input {
            "one_day" => Ok(RollingWindow::OneDay),
            "one_week" => Ok(RollingWindow::OneWeek),
            "one_month" => Ok(RollingWindow::OneMonth),
            "three_months" => Ok(RollingWindow::ThreeMonths),
            "one_year" => Ok(RollingWindow::OneYear),
            other => Err(AppError::validation(format!("unknown window: {other:?}"))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RollingWindow::OneDay => "one_day",
            RollingWindow::OneWeek => "one_week",
            RollingWindow::OneMonth => "one_month",
            RollingWindow::ThreeMonths => "three_months",
            RollingWindow::OneYear => "one_year",
        }
    }

    fn range(self) -> RangeKind {
        match self {
            RollingWindow::OneDay => RangeKind::Last24Hours,
            RollingWindow::OneWeek => RangeKind::OneWeek,
            RollingWindow::OneMonth => RangeKind::OneMonth,
            RollingWindow::ThreeMonths => RangeKind::ThreeMonths,
            RollingWindow::OneYear => RangeKind::OneYear,
        }
    }
}

pub struct Engine {
    store: Arc<dyn SensorStore>,
    clock: Arc<dyn Clock>,
}

impl Engine {
    // ---
    pub fn new(store: Arc<dyn SensorStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Today's date in Asia/Bangkok, `YYYY-MM-DD`.
    pub fn today_local(&self) -> String {
        self.clock
            .now()
            .with_timezone(&bangkok())
            .format("%Y-%m-%d")
            .to_string()
    }

    /// Bucketed series for a range.
    ///
    /// Without a filter there is one dataset per derived province, padded
    /// onto the shared label axis. With a filter, rows whose address or place
    /// contains it are collapsed into a single dataset named after it.
    pub async fn aggregate(
        &self,
        range: RangeKind,
        metric: Metric,
        filter: Option<&str>,
    ) -> AppResult<ChartSeries> {
        // ---
        let now = self.clock.now();
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());
        let query = SeriesQuery {
            start_ms: range.window_start(now).timestamp_millis(),
            end_ms: now.timestamp_millis(),
            bucket: range.bucket(),
            metric,
            filter: filter.map(str::to_string),
            latest_per_bucket: range.latest_per_bucket(),
        };

        debug!(range = range.keyword(), metric = metric.name(), ?filter, "aggregate");
        let rows = self.store.bucket_series(&query).await?;

        Ok(match filter {
            Some(label) => series::single_series(range, label, rows),
            None => series::reconcile(range, rows),
        })
    }

    /// Daily averages over the last year for one province or place.
    pub async fn heatmap_one_year(&self, province: &str, metric: Metric) -> AppResult<ChartSeries> {
        // ---
        let province = province.trim();
        if province.is_empty() {
            return Err(AppError::validation("province is required"));
        }
        self.aggregate(RangeKind::HeatmapYear, metric, Some(province))
            .await
    }

    /// Ranked leaderboard for one Bangkok calendar day.
    pub async fn rank_daily(&self, request: &RankRequest) -> AppResult<Vec<RankRow>> {
        // ---
        let (start, end) = request.window();
        let query = GroupQuery {
            start_ms: start.timestamp_millis(),
            end_ms: end.timestamp_millis(),
            metric: request.metric,
            group: request.group,
            limit: request.limit,
        };
        let rows = self.store.group_averages(&query).await?;
        Ok(rank::assign_ranks(request, rows))
    }

    pub async fn places(&self, filter: Option<&str>) -> AppResult<Vec<PlaceItem>> {
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());
        self.store.distinct_places(filter).await
    }

    pub async fn rolling_averages(&self, window: RollingWindow) -> AppResult<RollingAverages> {
        // ---
        let now = self.clock.now();
        let past = window.range().window_start(now);
        let data = self
            .store
            .address_averages(past.timestamp_millis(), now.timestamp_millis())
            .await?;
        Ok(RollingAverages {
            current_date: now,
            past_date: past,
            data,
        })
    }

    /// Per-province PM2.5 over the last 24 hours.
    pub async fn province_averages(&self) -> AppResult<Vec<ProvinceAverage>> {
        let (start, end) = self.last_24_hours();
        self.store
            .province_averages(start.timestamp_millis(), end.timestamp_millis())
            .await
    }

    pub async fn latest_reading(&self, filter: Option<&str>) -> AppResult<LatestReading> {
        // ---
        let filter = filter.map(str::trim).filter(|f| !f.is_empty());
        self.store
            .latest_reading(filter)
            .await?
            .ok_or_else(|| AppError::NotFound("no readings found".into()))
    }

    pub async fn ping(&self) -> AppResult<()> {
        self.store.ping().await
    }

    fn last_24_hours(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let now = self.clock.now();
        (now - Duration::hours(24), now)
    }
}

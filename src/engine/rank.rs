//! Same-day leaderboard: request validation and rank assignment.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};

use crate::clock::bangkok;
use crate::error::{AppError, AppResult};
use crate::models::RankRow;
use crate::store::GroupAverage;

use super::metric::{GroupDimension, Metric};

pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// A validated ranking request.
#[derive(Debug, Clone, PartialEq)]
pub struct RankRequest {
    pub date: NaiveDate,
    pub metric: Metric,
    pub group: GroupDimension,
    pub limit: i64,
}

impl RankRequest {
    // ---
    /// Validate raw parameters. Metric and group are strict; an unparsable
    /// limit falls back to the default and any number is clamped to 1..=100.
    pub fn parse(date: &str, metric: &str, group: &str, limit: Option<&str>) -> AppResult<Self> {
        // ---
        let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
            .map_err(|_| AppError::validation("invalid date (expect YYYY-MM-DD)"))?;
        let metric = Metric::for_ranking(metric)?;
        let group = GroupDimension::parse(group)?;
        let limit = clamp_limit(limit.and_then(|l| l.trim().parse::<i64>().ok()));

        Ok(RankRequest {
            date,
            metric,
            group,
            limit,
        })
    }

    pub fn date_string(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// `[date 00:00, date+1 00:00)` in Asia/Bangkok, as UTC instants.
    pub fn window(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        // ---
        let midnight = self.date.and_time(chrono::NaiveTime::MIN);
        let start = bangkok()
            .from_local_datetime(&midnight)
            .single()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&midnight));
        (start, start + Duration::days(1))
    }

    pub fn cache_key(&self) -> String {
        format!(
            "chart:rank:{}:{}:{}:{}",
            self.date_string(),
            self.metric.name(),
            self.group.name(),
            self.limit
        )
    }
}

pub fn clamp_limit(limit: Option<i64>) -> i64 {
    limit.map_or(DEFAULT_LIMIT, |l| l.clamp(1, MAX_LIMIT))
}

/// Assign rank-with-gaps to groups already sorted by average descending.
///
/// Equal averages share a rank; the next distinct average takes its
/// 1-based position, so ranks go 1, 2, 2, 4.
pub fn assign_ranks(request: &RankRequest, rows: Vec<GroupAverage>) -> Vec<RankRow> {
    // ---
    let date = request.date_string();
    let mut ranked: Vec<RankRow> = Vec::with_capacity(rows.len());
    let mut previous: Option<Option<f64>> = None;
    let mut current_rank = 0u32;

    for (position, row) in rows.into_iter().enumerate() {
        if previous != Some(row.avg) {
            current_rank = position as u32 + 1;
            previous = Some(row.avg);
        }
        ranked.push(RankRow {
            key: row.key,
            avg: row.avg.unwrap_or(0.0),
            rank: current_rank,
            count: row.count,
            date: date.clone(),
            metric: request.metric.name().to_string(),
            group: request.group.name().to_string(),
        });
    }
    ranked
}

//! Range keywords, bucket granularity and label formatting.

use chrono::{DateTime, Duration, Months, NaiveDateTime, TimeZone, Utc};

use crate::clock::bangkok;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RangeKind {
    Today,
    Last24Hours,
    OneWeek,
    OneMonth,
    ThreeMonths,
    OneYear,
    /// Daily buckets over the last year; not reachable from a keyword.
    HeatmapYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Hour,
    Day,
    Week,
    Month,
}

impl Bucket {
    /// Unit literal for `date_trunc`.
    pub fn unit(self) -> &'static str {
        match self {
            Bucket::Hour => "hour",
            Bucket::Day => "day",
            Bucket::Week => "week",
            Bucket::Month => "month",
        }
    }
}

impl RangeKind {
    // ---
    /// Resolve a range keyword. Anything unrecognised means "24 Hour".
    pub fn from_keyword(input: &str) -> RangeKind {
        // ---
        match input.trim() {
            "Today" => RangeKind::Today,
            "1 Week" => RangeKind::OneWeek,
            "1 Month" => RangeKind::OneMonth,
            "3 Month" => RangeKind::ThreeMonths,
            "1 Year" => RangeKind::OneYear,
            _ => RangeKind::Last24Hours,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            RangeKind::Today => "Today",
            RangeKind::Last24Hours => "24 Hour",
            RangeKind::OneWeek => "1 Week",
            RangeKind::OneMonth => "1 Month",
            RangeKind::ThreeMonths => "3 Month",
            RangeKind::OneYear => "1 Year",
            RangeKind::HeatmapYear => "Heatmap",
        }
    }

    pub fn bucket(self) -> Bucket {
        match self {
            RangeKind::Today | RangeKind::Last24Hours => Bucket::Hour,
            RangeKind::OneWeek | RangeKind::HeatmapYear => Bucket::Day,
            RangeKind::OneMonth => Bucket::Week,
            RangeKind::ThreeMonths | RangeKind::OneYear => Bucket::Month,
        }
    }

    /// "Today" keeps the newest reading of each hour instead of averaging.
    pub fn latest_per_bucket(self) -> bool {
        matches!(self, RangeKind::Today)
    }

    /// Inclusive lower bound of the window that ends at `now`.
    pub fn window_start(self, now: DateTime<Utc>) -> DateTime<Utc> {
        // ---
        match self {
            RangeKind::Today => local_midnight(now),
            RangeKind::Last24Hours => now - Duration::hours(24),
            RangeKind::OneWeek => now - Duration::days(7),
            RangeKind::OneMonth => months_back(now, 1),
            RangeKind::ThreeMonths => months_back(now, 3),
            RangeKind::OneYear | RangeKind::HeatmapYear => months_back(now, 12),
        }
    }

    /// Format a bucket start (Bangkok wall time) for the label axis.
    pub fn label(self, bucket: NaiveDateTime) -> String {
        // ---
        let pattern = match self {
            RangeKind::Today | RangeKind::Last24Hours => "%H:%M",
            RangeKind::OneWeek => "%a",
            RangeKind::OneMonth => "Wk %d",
            RangeKind::ThreeMonths | RangeKind::OneYear => "%b",
            RangeKind::HeatmapYear => "%Y-%m-%d",
        };
        bucket.format(pattern).to_string()
    }
}

/// Start of the current calendar day in Asia/Bangkok, as UTC.
pub fn local_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    // ---
    let tz = bangkok();
    let local_date = now.with_timezone(&tz).date_naive();
    local_date
        .and_hms_opt(0, 0, 0)
        .and_then(|midnight| tz.from_local_datetime(&midnight).single())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now - Duration::hours(24))
}

fn months_back(now: DateTime<Utc>, months: u32) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(months))
        .unwrap_or(now - Duration::days(30 * i64::from(months)))
}

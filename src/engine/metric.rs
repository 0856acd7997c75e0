//! Allow-lists mapping request strings onto fixed SQL columns.
//!
//! Nothing a caller sends is ever interpolated into a query; only the
//! `&'static str` fragments returned here are.

use crate::error::{AppError, AppResult};

/// Derived province: the text after `จ.` in the address, or the last
/// whitespace-separated token when the marker is missing.
pub const PROVINCE_EXPR: &str = r"COALESCE(NULLIF(TRIM(split_part(COALESCE(address, ''), 'จ.', 2)), ''), regexp_replace(TRIM(COALESCE(address, '')), '^.*\s+', ''))";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Pm25,
    Pm10,
    Pm100,
    Aqi,
    Temperature,
    Humidity,
}

impl Metric {
    // ---
    pub fn column(self) -> &'static str {
        match self {
            Metric::Pm25 => "pm25",
            Metric::Pm10 => "pm10",
            Metric::Pm100 => "pm100",
            Metric::Aqi => "aqi",
            Metric::Temperature => "temperature",
            Metric::Humidity => "humidity",
        }
    }

    pub fn name(self) -> &'static str {
        self.column()
    }

    /// Chart metric resolution. Unknown or empty input falls back to PM2.5.
    pub fn for_chart(input: &str) -> Metric {
        // ---
        match input.trim().to_ascii_lowercase().as_str() {
            "pm10" => Metric::Pm10,
            "aqi" => Metric::Aqi,
            "temperature" => Metric::Temperature,
            "humidity" => Metric::Humidity,
            _ => Metric::Pm25,
        }
    }

    /// Ranking metric resolution. Unknown input is a validation error.
    pub fn for_ranking(input: &str) -> AppResult<Metric> {
        // ---
        match input.trim().to_ascii_lowercase().as_str() {
            "pm25" => Ok(Metric::Pm25),
            "pm10" => Ok(Metric::Pm10),
            "pm100" => Ok(Metric::Pm100),
            "aqi" => Ok(Metric::Aqi),
            "temp" | "temperature" => Ok(Metric::Temperature),
            "humidity" => Ok(Metric::Humidity),
            other => Err(AppError::validation(format!("invalid metric: {other:?}"))),
        }
    }
}

/// Grouping dimension for the daily ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupDimension {
    Address,
    Place,
    Province,
}

impl GroupDimension {
    // ---
    pub fn parse(input: &str) -> AppResult<GroupDimension> {
        match input.trim().to_ascii_lowercase().as_str() {
            "address" => Ok(GroupDimension::Address),
            "place" => Ok(GroupDimension::Place),
            "province" => Ok(GroupDimension::Province),
            other => Err(AppError::validation(format!("invalid group: {other:?}"))),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GroupDimension::Address => "address",
            GroupDimension::Place => "place",
            GroupDimension::Province => "province",
        }
    }

    pub fn expr(self) -> &'static str {
        match self {
            GroupDimension::Address => "address",
            GroupDimension::Place => "place",
            GroupDimension::Province => PROVINCE_EXPR,
        }
    }
}

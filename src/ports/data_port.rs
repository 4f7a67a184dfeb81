//! Historical data port trait.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::error::SignalbenchError;
use crate::domain::ohlcv::PriceBar;

/// Unit of one bar's duration; a bar spans `interval` of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Timespan {
    Second,
    Minute,
    Hour,
    Day,
}

impl Timespan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timespan::Second => "second",
            Timespan::Minute => "minute",
            Timespan::Hour => "hour",
            Timespan::Day => "day",
        }
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timespan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "second" => Ok(Timespan::Second),
            "minute" => Ok(Timespan::Minute),
            "hour" => Ok(Timespan::Hour),
            "day" => Ok(Timespan::Day),
            other => Err(format!(
                "unknown timespan '{}', expected second|minute|hour|day",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoricalDataRequest {
    pub ticker: String,
    pub interval: u32,
    pub timespan: Timespan,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

pub trait DataPort {
    /// Bars for the request, sorted by time with no duplicate timestamps.
    fn fetch_bars(&self, request: &HistoricalDataRequest)
    -> Result<Vec<PriceBar>, SignalbenchError>;
}

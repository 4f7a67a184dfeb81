//! CSV file cache of historical bars.
//!
//! Files are named `{ticker}_{start}_to_{end}_{interval}_{timespan}.csv` and
//! hold a `Time,Open,High,Low,Close,Volume` header with RFC 3339 times.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use tracing::{debug, info};

use crate::domain::error::SignalbenchError;
use crate::domain::ohlcv::PriceBar;
use crate::ports::data_port::{DataPort, HistoricalDataRequest, Timespan};

const DATE_FORMAT: &str = "%Y-%m-%d";
const HEADER: [&str; 6] = ["Time", "Open", "High", "Low", "Close", "Volume"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

/// The parts encoded in a cache file name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CacheFile {
    ticker: String,
    start: NaiveDate,
    end: NaiveDate,
    interval: u32,
    timespan: Timespan,
}

impl CacheFile {
    fn parse(file_name: &str) -> Option<Self> {
        let stem = file_name.strip_suffix(".csv")?;
        let mut parts = stem.rsplitn(6, '_');
        let timespan = parts.next()?.parse().ok()?;
        let interval = parts.next()?.parse().ok()?;
        let end = NaiveDate::parse_from_str(parts.next()?, DATE_FORMAT).ok()?;
        if parts.next()? != "to" {
            return None;
        }
        let start = NaiveDate::parse_from_str(parts.next()?, DATE_FORMAT).ok()?;
        let ticker = parts.next()?.to_string();
        Some(Self {
            ticker,
            start,
            end,
            interval,
            timespan,
        })
    }

    fn overlaps(&self, request: &HistoricalDataRequest) -> bool {
        self.ticker == request.ticker
            && self.interval == request.interval
            && self.timespan == request.timespan
            && self.start <= request.end_date
            && self.end >= request.start_date
    }
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn cache_file_name(request: &HistoricalDataRequest) -> String {
        format!(
            "{}_{}_to_{}_{}_{}.csv",
            request.ticker,
            request.start_date.format(DATE_FORMAT),
            request.end_date.format(DATE_FORMAT),
            request.interval,
            request.timespan
        )
    }

    /// Cache files for the request's ticker, interval and timespan whose
    /// range overlaps the request, in file name order.
    fn covering_files(
        &self,
        request: &HistoricalDataRequest,
    ) -> Result<Vec<PathBuf>, SignalbenchError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| SignalbenchError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SignalbenchError::Data {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if CacheFile::parse(&name).is_some_and(|f| f.overlaps(request)) {
                files.push(entry.path());
            }
        }
        files.sort();
        Ok(files)
    }

    fn read_file(path: &Path) -> Result<Vec<PriceBar>, SignalbenchError> {
        let mut rdr = csv::Reader::from_path(path).map_err(|e| SignalbenchError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| SignalbenchError::Data {
                reason: format!("CSV parse error in {}: {}", path.display(), e),
            })?;

            let time_str = record.get(0).ok_or_else(|| SignalbenchError::Data {
                reason: "missing time column".into(),
            })?;
            let time = DateTime::parse_from_rfc3339(time_str)
                .map_err(|e| SignalbenchError::Data {
                    reason: format!("invalid time '{}': {}", time_str, e),
                })?
                .timestamp_millis();

            bars.push(PriceBar::new(
                time,
                column(&record, 1)?,
                column(&record, 2)?,
                column(&record, 3)?,
                column(&record, 4)?,
                column(&record, 5)?,
            ));
        }
        Ok(bars)
    }

    /// Writes `bars` to the cache file named for `request` and returns its
    /// path.
    pub fn save_bars(
        &self,
        request: &HistoricalDataRequest,
        bars: &[PriceBar],
    ) -> Result<PathBuf, SignalbenchError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.base_path.join(Self::cache_file_name(request));
        let mut wtr = csv::Writer::from_path(&path).map_err(|e| SignalbenchError::Data {
            reason: format!("failed to create {}: {}", path.display(), e),
        })?;

        let write_err = |e: csv::Error| SignalbenchError::Data {
            reason: format!("failed to write {}: {}", path.display(), e),
        };
        wtr.write_record(HEADER).map_err(write_err)?;
        for bar in bars {
            let time = DateTime::<Utc>::from_timestamp_millis(bar.time).ok_or_else(|| {
                SignalbenchError::Data {
                    reason: format!("timestamp {} out of range", bar.time),
                }
            })?;
            wtr.write_record([
                time.to_rfc3339_opts(SecondsFormat::AutoSi, true),
                bar.open.to_string(),
                bar.high.to_string(),
                bar.low.to_string(),
                bar.close.to_string(),
                bar.volume.to_string(),
            ])
            .map_err(write_err)?;
        }
        wtr.flush()?;
        info!(path = %path.display(), bars = bars.len(), "saved bars");
        Ok(path)
    }

    /// Copies the bars of `source` that fall on the request's days into the
    /// cache file named for `request`. Rows are sorted by time and a repeated
    /// timestamp keeps its last row.
    pub fn import(
        &self,
        request: &HistoricalDataRequest,
        source: &Path,
    ) -> Result<PathBuf, SignalbenchError> {
        let mut merged = BTreeMap::new();
        for bar in Self::read_file(source)? {
            merged.insert(bar.time, bar);
        }
        let bars: Vec<PriceBar> = merged
            .into_values()
            .filter(|bar| within_request(bar, request))
            .collect();
        if bars.is_empty() {
            return Err(no_data(request));
        }
        debug!(source = %source.display(), bars = bars.len(), "importing bars");
        self.save_bars(request, &bars)
    }
}

fn column(record: &csv::StringRecord, index: usize) -> Result<f64, SignalbenchError> {
    let name = HEADER[index];
    record
        .get(index)
        .ok_or_else(|| SignalbenchError::Data {
            reason: format!("missing {} column", name),
        })?
        .trim()
        .parse()
        .map_err(|e| SignalbenchError::Data {
            reason: format!("invalid {} value: {}", name, e),
        })
}

fn within_request(bar: &PriceBar, request: &HistoricalDataRequest) -> bool {
    DateTime::<Utc>::from_timestamp_millis(bar.time)
        .map(|t| t.date_naive())
        .is_some_and(|d| d >= request.start_date && d <= request.end_date)
}

fn no_data(request: &HistoricalDataRequest) -> SignalbenchError {
    SignalbenchError::NoData {
        ticker: request.ticker.clone(),
        start: request.start_date.to_string(),
        end: request.end_date.to_string(),
    }
}

impl DataPort for CsvAdapter {
    /// Merges every overlapping cache file. Where two files hold the same
    /// timestamp the one later in file name order wins.
    fn fetch_bars(
        &self,
        request: &HistoricalDataRequest,
    ) -> Result<Vec<PriceBar>, SignalbenchError> {
        let files = self.covering_files(request)?;
        if files.is_empty() {
            return Err(no_data(request));
        }

        let mut merged = BTreeMap::new();
        for path in &files {
            let bars = Self::read_file(path)?;
            debug!(path = %path.display(), bars = bars.len(), "read cache file");
            for bar in bars {
                merged.insert(bar.time, bar);
            }
        }

        let bars: Vec<PriceBar> = merged
            .into_values()
            .filter(|bar| within_request(bar, request))
            .collect();
        if bars.is_empty() {
            return Err(no_data(request));
        }
        info!(
            ticker = %request.ticker,
            files = files.len(),
            bars = bars.len(),
            "loaded historical data"
        );
        Ok(bars)
    }
}

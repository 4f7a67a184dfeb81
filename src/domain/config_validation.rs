//! Configuration validation.
//!
//! Validates every config field before a backtest runs and turns the raw
//! values into typed settings.

use std::collections::HashSet;
use std::fmt::Display;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;

use crate::domain::adapter::{AdapterKind, AdapterPoolConfig};
use crate::domain::backtest::{BacktestConfig, MAX_TRACK_ITERATIONS};
use crate::domain::error::SignalbenchError;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::{HistoricalDataRequest, Timespan};
use crate::ports::report_port::ReportFormat;

pub const DEFAULT_DATA_DIR: &str = "data";

/// Everything a backtest run needs from the config file.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub request: HistoricalDataRequest,
    pub backtest: BacktestConfig,
    pub adapters: AdapterPoolConfig,
    pub report: ReportSettings,
    pub metrics: MetricsSettings,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReportSettings {
    pub format: ReportFormat,
    pub output: Option<PathBuf>,
}

/// Where the Prometheus exposition of a run's metrics goes. No output means
/// metrics are not recorded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MetricsSettings {
    pub prometheus_output: Option<PathBuf>,
}

pub fn load_settings(config: &dyn ConfigPort) -> Result<Settings, SignalbenchError> {
    let (data_dir, request) = validate_data_config(config)?;
    Ok(Settings {
        data_dir,
        request,
        backtest: validate_backtest_config(config)?,
        adapters: validate_adapter_config(config)?,
        report: validate_report_config(config)?,
        metrics: validate_metrics_config(config),
    })
}

pub fn validate_data_config(
    config: &dyn ConfigPort,
) -> Result<(PathBuf, HistoricalDataRequest), SignalbenchError> {
    const SECTION: &str = "data";
    let data_dir = config
        .get_string(SECTION, "dir")
        .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
    let ticker = config
        .get_string(SECTION, "ticker")
        .ok_or_else(|| SignalbenchError::missing(SECTION, "ticker"))?;
    if ticker.contains(['/', '\\']) {
        return Err(SignalbenchError::invalid(
            SECTION,
            "ticker",
            "ticker must not contain path separators",
        ));
    }
    let interval: u32 = parse_or(config, SECTION, "interval", 1)?;
    if interval == 0 {
        return Err(SignalbenchError::invalid(SECTION, "interval", "interval must be at least 1"));
    }
    let timespan: Timespan = parse_or(config, SECTION, "timespan", Timespan::Day)?;
    let start_date = parse_date(config, SECTION, "start_date")?;
    let end_date = parse_date(config, SECTION, "end_date")?;
    if start_date > end_date {
        return Err(SignalbenchError::invalid(
            SECTION,
            "start_date",
            "start_date must not be after end_date",
        ));
    }

    Ok((
        PathBuf::from(data_dir),
        HistoricalDataRequest {
            ticker,
            interval,
            timespan,
            start_date,
            end_date,
        },
    ))
}

pub fn validate_backtest_config(
    config: &dyn ConfigPort,
) -> Result<BacktestConfig, SignalbenchError> {
    const SECTION: &str = "backtest";
    let defaults = BacktestConfig::default();
    let track_iterations = validate_track_iterations(parse_or(
        config,
        SECTION,
        "track_iterations",
        defaults.track_iterations,
    )?)?;
    let combine = match config.get_string(SECTION, "combine") {
        None => defaults.combine,
        Some(value) => parse_bool(&value).ok_or_else(|| {
            SignalbenchError::invalid(
                SECTION,
                "combine",
                format!("expected a boolean, got '{}'", value),
            )
        })?,
    };
    Ok(BacktestConfig {
        track_iterations,
        combine,
    })
}

/// Bounds a position horizon to `1..=MAX_TRACK_ITERATIONS`. Every report
/// carries one summary column per tracked iteration.
pub fn validate_track_iterations(value: usize) -> Result<usize, SignalbenchError> {
    if !(1..=MAX_TRACK_ITERATIONS).contains(&value) {
        return Err(SignalbenchError::invalid(
            "backtest",
            "track_iterations",
            format!("track_iterations must be between 1 and {}", MAX_TRACK_ITERATIONS),
        ));
    }
    Ok(value)
}

pub fn validate_adapter_config(
    config: &dyn ConfigPort,
) -> Result<AdapterPoolConfig, SignalbenchError> {
    const SECTION: &str = "adapters";
    let mut pool = AdapterPoolConfig::default();

    if let Some(names) = config.get_list(SECTION, "enabled") {
        let mut seen = HashSet::new();
        let mut enabled = Vec::with_capacity(names.len());
        for name in names {
            let kind: AdapterKind = name
                .parse()
                .map_err(|reason: String| SignalbenchError::invalid(SECTION, "enabled", reason))?;
            if !seen.insert(kind) {
                return Err(SignalbenchError::invalid(
                    SECTION,
                    "enabled",
                    format!("adapter '{}' listed more than once", kind),
                ));
            }
            enabled.push(kind);
        }
        pool.enabled = enabled;
    }
    if pool.enabled.is_empty() {
        return Err(SignalbenchError::invalid(
            SECTION,
            "enabled",
            "at least one adapter must be enabled",
        ));
    }

    if let Some(periods) = config.get_list(SECTION, "ema_periods") {
        pool.ema.periods = periods
            .iter()
            .map(|p| match p.parse::<usize>() {
                Ok(v) if v >= 1 => Ok(v),
                _ => Err(SignalbenchError::invalid(
                    SECTION,
                    "ema_periods",
                    format!("'{}' is not a positive integer", p),
                )),
            })
            .collect::<Result<_, _>>()?;
    }
    if pool.ema.periods.len() < 2 {
        return Err(SignalbenchError::invalid(
            SECTION,
            "ema_periods",
            "at least two EMA periods are required",
        ));
    }
    pool.ema.history = at_least(config, SECTION, "ema_history", pool.ema.history, 2)?;

    pool.rsi.period = at_least(config, SECTION, "rsi_period", pool.rsi.period, 2)?;
    pool.rsi.overbought = parse_or(config, SECTION, "rsi_overbought", pool.rsi.overbought)?;
    pool.rsi.oversold = parse_or(config, SECTION, "rsi_oversold", pool.rsi.oversold)?;
    for (key, value) in [
        ("rsi_overbought", pool.rsi.overbought),
        ("rsi_oversold", pool.rsi.oversold),
    ] {
        if !(0.0..=100.0).contains(&value) {
            return Err(SignalbenchError::invalid(SECTION, key, "must be between 0 and 100"));
        }
    }
    if pool.rsi.oversold >= pool.rsi.overbought {
        return Err(SignalbenchError::invalid(
            SECTION,
            "rsi_oversold",
            "rsi_oversold must be below rsi_overbought",
        ));
    }
    pool.rsi.history = at_least(config, SECTION, "rsi_history", pool.rsi.history, 2)?;

    pool.macd.short = at_least(config, SECTION, "macd_short", pool.macd.short, 1)?;
    pool.macd.long = at_least(config, SECTION, "macd_long", pool.macd.long, 1)?;
    pool.macd.signal = at_least(config, SECTION, "macd_signal", pool.macd.signal, 1)?;
    if pool.macd.short >= pool.macd.long {
        return Err(SignalbenchError::invalid(
            SECTION,
            "macd_short",
            "macd_short must be below macd_long",
        ));
    }
    pool.macd.history = at_least(config, SECTION, "macd_history", pool.macd.history, 2)?;

    pool.bollinger.period =
        at_least(config, SECTION, "bollinger_period", pool.bollinger.period, 1)?;
    pool.bollinger.history =
        at_least(config, SECTION, "bollinger_history", pool.bollinger.history, 2)?;

    pool.pivot.history = at_least(config, SECTION, "pivot_history", pool.pivot.history, 1)?;
    pool.pivot.threshold = at_least(config, SECTION, "pivot_threshold", pool.pivot.threshold, 1)?;

    pool.fibonacci.size = at_least(config, SECTION, "fibonacci_size", pool.fibonacci.size, 2)?;

    pool.supertrend.period =
        at_least(config, SECTION, "supertrend_period", pool.supertrend.period, 1)?;
    pool.supertrend.multiplier =
        parse_or(config, SECTION, "supertrend_multiplier", pool.supertrend.multiplier)?;
    if !(pool.supertrend.multiplier > 0.0 && pool.supertrend.multiplier.is_finite()) {
        return Err(SignalbenchError::invalid(
            SECTION,
            "supertrend_multiplier",
            "supertrend_multiplier must be positive",
        ));
    }

    Ok(pool)
}

pub fn validate_report_config(
    config: &dyn ConfigPort,
) -> Result<ReportSettings, SignalbenchError> {
    const SECTION: &str = "report";
    Ok(ReportSettings {
        format: parse_or(config, SECTION, "format", ReportFormat::default())?,
        output: config.get_string(SECTION, "output").map(PathBuf::from),
    })
}

pub fn validate_metrics_config(config: &dyn ConfigPort) -> MetricsSettings {
    MetricsSettings {
        prometheus_output: config
            .get_string("metrics", "prometheus_output")
            .map(PathBuf::from),
    }
}

pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn parse_or<T>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, SignalbenchError>
where
    T: FromStr,
    T::Err: Display,
{
    match config.get_string(section, key) {
        None => Ok(default),
        Some(value) => value
            .parse()
            .map_err(|e| SignalbenchError::invalid(section, key, format!("'{}': {}", value, e))),
    }
}

fn at_least(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
    min: usize,
) -> Result<usize, SignalbenchError> {
    let value: usize = parse_or(config, section, key, default)?;
    if value < min {
        return Err(SignalbenchError::invalid(
            section,
            key,
            format!("{} must be at least {}", key, min),
        ));
    }
    Ok(value)
}

fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDate, SignalbenchError> {
    let value = config
        .get_string(section, key)
        .ok_or_else(|| SignalbenchError::missing(section, key))?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d").map_err(|_| {
        SignalbenchError::invalid(
            section,
            key,
            format!("invalid {} format, expected YYYY-MM-DD", key),
        )
    })
}

//! Streaming technical indicators.
//!
//! Each indicator consumes one [`PriceBar`] at a time through `add_bar` and
//! keeps its own bounded history. Bars must arrive with strictly increasing
//! timestamps; an out-of-order bar is rejected and leaves the indicator
//! untouched. Until enough bars have been seen, `is_initialized()` is false
//! and every derived value reads as zero.

pub mod bollinger;
pub mod ema;
pub mod fibonacci;
pub mod macd;
pub mod pivot;
pub mod rsi;
pub mod supertrend;

pub use bollinger::{BollingerBands, BollingerValue};
pub use ema::Ema;
pub use fibonacci::{Fibonacci, FibonacciLevel, FibonacciLevels};
pub use macd::{Macd, MacdValue};
pub use pivot::{PivotLevel, PivotLevels, PivotPoint};
pub use rsi::Rsi;
pub use supertrend::SuperTrend;

use crate::domain::error::IndicatorError;
use crate::domain::ohlcv::PriceBar;

/// Rejects `bar` unless it is strictly after `last_time`.
pub(crate) fn ensure_after(last_time: Option<i64>, bar: &PriceBar) -> Result<(), IndicatorError> {
    match last_time {
        Some(previous) if bar.time <= previous => Err(IndicatorError::OutOfOrder {
            previous,
            received: bar.time,
        }),
        _ => Ok(()),
    }
}

/// Arithmetic mean; zero for an empty input.
pub(crate) fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    values.sum::<f64>() / n as f64
}

#[cfg(test)]
pub(crate) mod test_bars {
    use crate::domain::ohlcv::PriceBar;

    /// Flat bars (open = high = low = close) at times 1, 2, 3, ...
    pub fn closes(prices: &[f64]) -> Vec<PriceBar> {
        prices
            .iter()
            .enumerate()
            .map(|(i, &close)| PriceBar::new(i as i64 + 1, close, close, close, close, 1000.0))
            .collect()
    }

    /// Bars from (high, low, close) triples at times 1, 2, 3, ...
    pub fn hlc(rows: &[(f64, f64, f64)]) -> Vec<PriceBar> {
        rows.iter()
            .enumerate()
            .map(|(i, &(high, low, close))| {
                PriceBar::new(i as i64 + 1, close, high, low, close, 1000.0)
            })
            .collect()
    }
}

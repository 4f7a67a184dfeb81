//! MACD (Moving Average Convergence Divergence).
//!
//! Once `long` bars are held, the short and long EMAs are seeded with simple
//! averages of the last `short`/`long` closes. Later bars update both EMAs
//! incrementally with their own multipliers. The signal line is an EMA of
//! (short EMA - long EMA) with k = 2/(signal+1), starting from zero.
//!
//! MACD Line = short EMA - long EMA
//! Histogram = MACD Line - Signal Line

use crate::domain::error::IndicatorError;
use crate::domain::indicator::{ensure_after, mean};
use crate::domain::ohlcv::PriceBar;
use crate::domain::window::RollingWindow;

pub const DEFAULT_SHORT: usize = 12;
pub const DEFAULT_LONG: usize = 26;
pub const DEFAULT_SIGNAL: usize = 9;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MacdValue {
    pub macd_line: f64,
    pub signal_line: f64,
    pub histogram: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Macd {
    short_period: usize,
    long_period: usize,
    signal_period: usize,
    history: RollingWindow<PriceBar>,
    short_ema: f64,
    long_ema: f64,
    signal_line: f64,
    initialized: bool,
}

impl Macd {
    pub fn new(short_period: usize, long_period: usize, signal_period: usize) -> Self {
        Self {
            short_period,
            long_period,
            signal_period,
            history: RollingWindow::new(long_period),
            short_ema: 0.0,
            long_ema: 0.0,
            signal_line: 0.0,
            initialized: false,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_SHORT, DEFAULT_LONG, DEFAULT_SIGNAL)
    }

    pub fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        ensure_after(self.history.last().map(|b| b.time), bar)?;
        self.history.push(*bar);

        if self.history.len() < self.long_period {
            return Ok(());
        }

        if self.initialized {
            self.short_ema = step(self.short_ema, bar.close, self.short_period);
            self.long_ema = step(self.long_ema, bar.close, self.long_period);
        } else {
            self.short_ema = self.trailing_average(self.short_period);
            self.long_ema = self.trailing_average(self.long_period);
            self.initialized = true;
        }

        self.signal_line = step(
            self.signal_line,
            self.short_ema - self.long_ema,
            self.signal_period,
        );
        Ok(())
    }

    fn trailing_average(&self, period: usize) -> f64 {
        let skip = self.history.len().saturating_sub(period);
        let closes: Vec<f64> = self.history.iter().skip(skip).map(|b| b.close).collect();
        mean(closes.into_iter())
    }

    pub fn short_period(&self) -> usize {
        self.short_period
    }

    pub fn long_period(&self) -> usize {
        self.long_period
    }

    pub fn signal_period(&self) -> usize {
        self.signal_period
    }

    /// Current MACD lines; all zero until initialized.
    pub fn value(&self) -> MacdValue {
        let macd_line = self.short_ema - self.long_ema;
        MacdValue {
            macd_line,
            signal_line: self.signal_line,
            histogram: macd_line - self.signal_line,
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

fn step(previous: f64, input: f64, period: usize) -> f64 {
    (input - previous) * (2.0 / (period as f64 + 1.0)) + previous
}

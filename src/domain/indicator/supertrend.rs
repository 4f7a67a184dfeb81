//! SuperTrend.
//!
//! ATR is the sum of true ranges between consecutive bars of the trailing
//! `period`-bar window, divided by `period`. The trend starts down:
//!
//! - up-trend: line = midpoint - multiplier × ATR, flip down if close < line
//! - down-trend: line = midpoint + multiplier × ATR, flip up if close > line
//!
//! Bars with any non-positive price are rejected.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::ensure_after;
use crate::domain::ohlcv::PriceBar;
use crate::domain::window::RollingWindow;

#[derive(Debug, Clone, PartialEq)]
pub struct SuperTrend {
    period: usize,
    multiplier: f64,
    history: RollingWindow<PriceBar>,
    atr: f64,
    line: f64,
    is_up_trend: bool,
    initialized: bool,
}

impl SuperTrend {
    pub fn new(period: usize, multiplier: f64) -> Self {
        Self {
            period,
            multiplier,
            history: RollingWindow::new(period),
            atr: 0.0,
            line: 0.0,
            is_up_trend: false,
            initialized: false,
        }
    }

    pub fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        ensure_after(self.history.last().map(|b| b.time), bar)?;
        if !bar.has_positive_prices() {
            return Err(IndicatorError::InvalidInput {
                time: bar.time,
                reason: "prices must be positive".into(),
            });
        }
        self.history.push(*bar);

        if self.period == 0 || self.history.len() < self.period {
            return Ok(());
        }
        self.initialized = true;

        let tr_sum: f64 = self
            .history
            .iter()
            .zip(self.history.iter().skip(1))
            .map(|(prev, curr)| curr.true_range(prev.close))
            .sum();
        self.atr = tr_sum / self.period as f64;

        let band = self.multiplier * self.atr;
        let midpoint = bar.midpoint();
        if self.is_up_trend {
            self.line = midpoint - band;
            if bar.close < self.line {
                self.is_up_trend = false;
            }
        } else {
            self.line = midpoint + band;
            if bar.close > self.line {
                self.is_up_trend = true;
            }
        }
        Ok(())
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn atr(&self) -> f64 {
        self.atr
    }

    /// Current trend line; zero until initialized.
    pub fn line(&self) -> f64 {
        self.line
    }

    pub fn is_up_trend(&self) -> bool {
        self.is_up_trend
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

//! Bollinger Bands.
//!
//! - Middle: simple moving average of the trailing `period` closes
//! - Upper: middle + 2 × stddev
//! - Lower: middle - 2 × stddev
//!
//! Where stddev is the population standard deviation (divides by N, not N-1).

use crate::domain::error::IndicatorError;
use crate::domain::indicator::ensure_after;
use crate::domain::ohlcv::PriceBar;
use crate::domain::window::RollingWindow;

pub const BAND_WIDTH: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BollingerValue {
    pub moving_average: f64,
    pub upper_band: f64,
    pub lower_band: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BollingerBands {
    period: usize,
    history: RollingWindow<PriceBar>,
    value: BollingerValue,
    initialized: bool,
}

impl BollingerBands {
    pub fn new(period: usize) -> Self {
        Self {
            period,
            history: RollingWindow::new(period),
            value: BollingerValue::default(),
            initialized: false,
        }
    }

    pub fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        ensure_after(self.history.last().map(|b| b.time), bar)?;
        self.history.push(*bar);

        if self.period == 0 || self.history.len() < self.period {
            return Ok(());
        }

        let n = self.period as f64;
        let moving_average = self.history.iter().map(|b| b.close).sum::<f64>() / n;
        let variance = self
            .history
            .iter()
            .map(|b| {
                let diff = b.close - moving_average;
                diff * diff
            })
            .sum::<f64>()
            / n;
        let stddev = variance.sqrt();

        self.value = BollingerValue {
            moving_average,
            upper_band: moving_average + BAND_WIDTH * stddev,
            lower_band: moving_average - BAND_WIDTH * stddev,
        };
        self.initialized = true;
        Ok(())
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Current bands; all zero until initialized.
    pub fn value(&self) -> BollingerValue {
        self.value
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

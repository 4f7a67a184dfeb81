//! Relative Strength Index.
//!
//! Once `period` bars are held, the average gain/loss is seeded with the mean
//! of the `period - 1` close-to-close changes in the window. Each later bar
//! applies Wilder's smoothing: avg = (prev_avg * (n-1) + current) / n.
//!
//! RSI = 100 - 100 / (1 + avg_gain / avg_loss), or 100 when avg_loss == 0.

use crate::domain::error::IndicatorError;
use crate::domain::indicator::{ensure_after, mean};
use crate::domain::ohlcv::PriceBar;
use crate::domain::window::RollingWindow;

#[derive(Debug, Clone, PartialEq)]
pub struct Rsi {
    period: usize,
    history: RollingWindow<PriceBar>,
    avg_gain: f64,
    avg_loss: f64,
    initialized: bool,
}

impl Rsi {
    /// `period` should be at least 2; a shorter period never has a change to
    /// average over.
    pub fn new(period: usize) -> Self {
        Self {
            period,
            history: RollingWindow::new(period),
            avg_gain: 0.0,
            avg_loss: 0.0,
            initialized: false,
        }
    }

    pub fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        ensure_after(self.history.last().map(|b| b.time), bar)?;
        self.history.push(*bar);

        if self.history.len() < self.period {
            return Ok(());
        }

        if self.initialized {
            self.smooth();
        } else {
            self.seed();
            self.initialized = true;
        }
        Ok(())
    }

    fn seed(&mut self) {
        let changes: Vec<f64> = self
            .history
            .iter()
            .zip(self.history.iter().skip(1))
            .map(|(prev, curr)| curr.close - prev.close)
            .collect();
        self.avg_gain = mean(changes.iter().map(|c| c.max(0.0)));
        self.avg_loss = mean(changes.iter().map(|c| (-c).max(0.0)));
    }

    fn smooth(&mut self) {
        let prev = self
            .history
            .len()
            .checked_sub(2)
            .and_then(|i| self.history.get(i));
        let (Some(prev), Some(curr)) = (prev, self.history.last()) else {
            return;
        };
        let change = curr.close - prev.close;
        let n = self.period as f64;
        self.avg_gain = (self.avg_gain * (n - 1.0) + change.max(0.0)) / n;
        self.avg_loss = (self.avg_loss * (n - 1.0) + (-change).max(0.0)) / n;
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn avg_gain(&self) -> f64 {
        self.avg_gain
    }

    pub fn avg_loss(&self) -> f64 {
        self.avg_loss
    }

    /// Current RSI in [0, 100]; zero until initialized.
    pub fn value(&self) -> f64 {
        if !self.initialized {
            return 0.0;
        }
        if self.avg_loss == 0.0 {
            return 100.0;
        }
        100.0 - 100.0 / (1.0 + self.avg_gain / self.avg_loss)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

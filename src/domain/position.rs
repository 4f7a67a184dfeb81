//! Positions opened by algorithm signals and tracked for a fixed horizon.

use crate::domain::ohlcv::PriceBar;
use crate::domain::signal::{StockAction, TradingSignal};

/// One profit sample taken on the bar `iteration` steps after entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationRecord {
    pub time: i64,
    pub price: f64,
    pub profit: f64,
    pub iteration: usize,
}

/// A position opened on a Buy or Sell signal. There is no exit logic: the
/// position is sampled once per bar until the engine closes it.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub entry: PriceBar,
    pub signal: TradingSignal,
    pub current_profit: f64,
    pub iteration_count: usize,
    pub iterations: Vec<IterationRecord>,
}

impl OpenPosition {
    pub fn open(entry: PriceBar, signal: TradingSignal) -> Self {
        Self {
            entry,
            signal,
            current_profit: 0.0,
            iteration_count: 0,
            iterations: Vec::new(),
        }
    }

    /// Profit of holding from entry to `close`. Sell positions profit when
    /// the price falls.
    pub fn profit_at(&self, close: f64) -> f64 {
        match self.signal.action {
            StockAction::Sell => self.entry.close - close,
            _ => close - self.entry.close,
        }
    }

    /// Takes the next profit sample from `bar`.
    pub fn advance(&mut self, bar: &PriceBar) -> IterationRecord {
        self.iteration_count += 1;
        self.current_profit = self.profit_at(bar.close);
        let record = IterationRecord {
            time: bar.time,
            price: bar.close,
            profit: self.current_profit,
            iteration: self.iteration_count,
        };
        self.iterations.push(record);
        record
    }

    pub fn is_complete(&self, track_iterations: usize) -> bool {
        self.iteration_count >= track_iterations
    }

    /// `profit` as a percentage of the entry close. Zero when the entry
    /// close is zero.
    pub fn profit_percent(&self, profit: f64) -> f64 {
        if self.entry.close == 0.0 {
            0.0
        } else {
            profit / self.entry.close * 100.0
        }
    }
}

//! Trading opinions and decisions.

use std::fmt;

/// A ternary trading opinion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StockAction {
    Buy,
    Sell,
    Wait,
}

impl StockAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            StockAction::Buy => "buy",
            StockAction::Sell => "sell",
            StockAction::Wait => "wait",
        }
    }

    /// Buy and Sell open positions; Wait does not.
    pub fn is_actionable(&self) -> bool {
        !matches!(self, StockAction::Wait)
    }
}

impl fmt::Display for StockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The decision an algorithm reached on the bar at `time`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingSignal {
    pub time: i64,
    pub action: StockAction,
}

impl TradingSignal {
    pub fn new(time: i64, action: StockAction) -> Self {
        Self { time, action }
    }

    pub fn wait(time: i64) -> Self {
        Self::new(time, StockAction::Wait)
    }
}

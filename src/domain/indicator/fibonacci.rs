//! Fibonacci retracement levels over a rolling window.
//!
//! high = max(High), low = min(Low) over the last `size` bars; each level is
//! high - ratio × (high - low), so 0% is the high and 100% is the low.

use std::fmt;

use crate::domain::error::IndicatorError;
use crate::domain::indicator::ensure_after;
use crate::domain::ohlcv::PriceBar;
use crate::domain::window::RollingWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FibonacciLevel {
    Zero,
    TwentyThree,
    ThirtyEight,
    Fifty,
    SixtyOne,
    SeventySix,
    Hundred,
}

impl FibonacciLevel {
    pub const ALL: [FibonacciLevel; 7] = [
        FibonacciLevel::Zero,
        FibonacciLevel::TwentyThree,
        FibonacciLevel::ThirtyEight,
        FibonacciLevel::Fifty,
        FibonacciLevel::SixtyOne,
        FibonacciLevel::SeventySix,
        FibonacciLevel::Hundred,
    ];

    pub fn ratio(&self) -> f64 {
        match self {
            FibonacciLevel::Zero => 0.0,
            FibonacciLevel::TwentyThree => 0.236,
            FibonacciLevel::ThirtyEight => 0.382,
            FibonacciLevel::Fifty => 0.5,
            FibonacciLevel::SixtyOne => 0.618,
            FibonacciLevel::SeventySix => 0.764,
            FibonacciLevel::Hundred => 1.0,
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for FibonacciLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1}%", self.ratio() * 100.0)
    }
}

/// Price at each retracement level.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FibonacciLevels([f64; 7]);

impl FibonacciLevels {
    pub fn from_range(high: f64, low: f64) -> Self {
        let range = high - low;
        let mut prices = [0.0; 7];
        for level in FibonacciLevel::ALL {
            prices[level.index()] = match level {
                FibonacciLevel::Zero => high,
                FibonacciLevel::Hundred => low,
                _ => high - level.ratio() * range,
            };
        }
        Self(prices)
    }

    pub fn get(&self, level: FibonacciLevel) -> f64 {
        self.0[level.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (FibonacciLevel, f64)> + '_ {
        FibonacciLevel::ALL.iter().map(|l| (*l, self.get(*l)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fibonacci {
    size: usize,
    history: RollingWindow<PriceBar>,
    high: f64,
    low: f64,
    levels: FibonacciLevels,
    initialized: bool,
}

impl Fibonacci {
    pub fn new(size: usize) -> Self {
        Self {
            size,
            history: RollingWindow::new(size),
            high: 0.0,
            low: 0.0,
            levels: FibonacciLevels::default(),
            initialized: false,
        }
    }

    pub fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        ensure_after(self.history.last().map(|b| b.time), bar)?;
        self.history.push(*bar);

        if self.size == 0 || self.history.len() < self.size {
            return Ok(());
        }

        self.high = self
            .history
            .iter()
            .map(|b| b.high)
            .fold(f64::NEG_INFINITY, f64::max);
        self.low = self
            .history
            .iter()
            .map(|b| b.low)
            .fold(f64::INFINITY, f64::min);
        self.levels = FibonacciLevels::from_range(self.high, self.low);
        self.initialized = true;
        Ok(())
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn high(&self) -> f64 {
        self.high
    }

    pub fn low(&self) -> f64 {
        self.low
    }

    /// Current levels; all zero until initialized.
    pub fn levels(&self) -> FibonacciLevels {
        self.levels
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

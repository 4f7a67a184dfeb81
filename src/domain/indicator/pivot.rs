//! Classic floor-trader pivot points.
//!
//! Levels are derived from the previous bar's high, low and close, so the
//! first bar only seeds the indicator and levels exist from the second bar.
//!
//! P = (H + L + C) / 3
//! S1 = 2P - H, S2 = P - (H - L), S3 = L - 2(H - P)
//! R1 = 2P - L, R2 = P + (H - L), R3 = H + 2(P - L)

use std::fmt;

use crate::domain::error::IndicatorError;
use crate::domain::indicator::ensure_after;
use crate::domain::ohlcv::PriceBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PivotLevel {
    Support3,
    Support2,
    Support1,
    Pivot,
    Resistance1,
    Resistance2,
    Resistance3,
}

impl PivotLevel {
    pub const ALL: [PivotLevel; 7] = [
        PivotLevel::Support3,
        PivotLevel::Support2,
        PivotLevel::Support1,
        PivotLevel::Pivot,
        PivotLevel::Resistance1,
        PivotLevel::Resistance2,
        PivotLevel::Resistance3,
    ];
}

impl fmt::Display for PivotLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PivotLevel::Support3 => "Support3",
            PivotLevel::Support2 => "Support2",
            PivotLevel::Support1 => "Support1",
            PivotLevel::Pivot => "Pivot",
            PivotLevel::Resistance1 => "Resistance1",
            PivotLevel::Resistance2 => "Resistance2",
            PivotLevel::Resistance3 => "Resistance3",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PivotLevels {
    pub pivot: f64,
    pub support1: f64,
    pub support2: f64,
    pub support3: f64,
    pub resistance1: f64,
    pub resistance2: f64,
    pub resistance3: f64,
}

impl PivotLevels {
    pub fn from_bar(bar: &PriceBar) -> Self {
        let (high, low, close) = (bar.high, bar.low, bar.close);
        let pivot = (high + low + close) / 3.0;
        Self {
            pivot,
            support1: 2.0 * pivot - high,
            support2: pivot - (high - low),
            support3: low - 2.0 * (high - pivot),
            resistance1: 2.0 * pivot - low,
            resistance2: pivot + (high - low),
            resistance3: high + 2.0 * (pivot - low),
        }
    }

    pub fn get(&self, level: PivotLevel) -> f64 {
        match level {
            PivotLevel::Support3 => self.support3,
            PivotLevel::Support2 => self.support2,
            PivotLevel::Support1 => self.support1,
            PivotLevel::Pivot => self.pivot,
            PivotLevel::Resistance1 => self.resistance1,
            PivotLevel::Resistance2 => self.resistance2,
            PivotLevel::Resistance3 => self.resistance3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct PivotPoint {
    previous: Option<PriceBar>,
    levels: PivotLevels,
    initialized: bool,
}

impl PivotPoint {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        ensure_after(self.previous.map(|b| b.time), bar)?;

        if let Some(previous) = &self.previous {
            self.levels = PivotLevels::from_bar(previous);
            self.initialized = true;
        }
        self.previous = Some(*bar);
        Ok(())
    }

    /// Levels computed from the bar before the most recent one; zero until
    /// two bars have been seen.
    pub fn levels(&self) -> PivotLevels {
        self.levels
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_bars::hlc;
    use approx::assert_relative_eq;

    #[test]
    fn first_bar_only_seeds() {
        let mut pp = PivotPoint::new();
        pp.add_bar(&hlc(&[(110.0, 90.0, 100.0)])[0]).unwrap();
        assert!(!pp.is_initialized());
        assert_eq!(pp.levels(), PivotLevels::default());
    }

    #[test]
    fn levels_use_prior_bar() {
        let bars = hlc(&[(110.0, 90.0, 100.0), (200.0, 150.0, 180.0)]);
        let mut pp = PivotPoint::new();
        for bar in &bars {
            pp.add_bar(bar).unwrap();
        }
        assert!(pp.is_initialized());

        let l = pp.levels();
        assert_relative_eq!(l.pivot, 100.0);
        assert_relative_eq!(l.support1, 90.0);
        assert_relative_eq!(l.support2, 80.0);
        assert_relative_eq!(l.support3, 70.0);
        assert_relative_eq!(l.resistance1, 110.0);
        assert_relative_eq!(l.resistance2, 120.0);
        assert_relative_eq!(l.resistance3, 130.0);
    }

    #[test]
    fn level_lookup_and_order() {
        let levels = PivotLevels::from_bar(&hlc(&[(110.0, 90.0, 100.0)])[0]);
        let values: Vec<f64> = PivotLevel::ALL.iter().map(|l| levels.get(*l)).collect();
        assert!(values.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(PivotLevel::Resistance2.to_string(), "Resistance2");
    }

    #[test]
    fn rejects_out_of_order_bar() {
        let bars = hlc(&[(110.0, 90.0, 100.0), (200.0, 150.0, 180.0)]);
        let mut pp = PivotPoint::new();
        for bar in &bars {
            pp.add_bar(bar).unwrap();
        }
        let before = pp.clone();
        assert!(pp.add_bar(&bars[0]).is_err());
        assert_eq!(pp, before);
    }
}

#![allow(dead_code)]

use signalbench::domain::adapter::SignalAdapter;
use signalbench::domain::error::{IndicatorError, SignalbenchError};
pub use signalbench::domain::ohlcv::PriceBar;
use signalbench::domain::signal::StockAction;
use signalbench::ports::data_port::{DataPort, HistoricalDataRequest};
use signalbench::ports::metrics_port::Labels;

pub struct MockDataPort {
    pub bars: Vec<PriceBar>,
    pub error: Option<String>,
}

impl MockDataPort {
    pub fn new(bars: Vec<PriceBar>) -> Self {
        Self { bars, error: None }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            bars: Vec::new(),
            error: Some(reason.to_string()),
        }
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        _request: &HistoricalDataRequest,
    ) -> Result<Vec<PriceBar>, SignalbenchError> {
        if let Some(reason) = &self.error {
            return Err(SignalbenchError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self.bars.clone())
    }
}

pub fn bar(time: i64, close: f64) -> PriceBar {
    PriceBar::new(time, close, close + 1.0, close - 1.0, close, 1000.0)
}

/// Bars at times 1, 2, 3, ... with the given closes.
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| bar(i as i64 + 1, close))
        .collect()
}

/// 2024-01-01T00:00:00Z in milliseconds.
pub const JAN_1_2024_MS: i64 = 1_704_067_200_000;
pub const DAY_MS: i64 = 86_400_000;

/// Daily bars from 2024-01-01 on a swinging price series that makes most
/// indicators initialize and flip.
pub fn wave_bars(n: usize) -> Vec<PriceBar> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            let close = 100.0 + (t * 0.35).sin() * 12.0 + (t * 0.05).cos() * 4.0;
            PriceBar::new(
                JAN_1_2024_MS + i as i64 * DAY_MS,
                close - 0.5,
                close + 2.0,
                close - 2.0,
                close,
                1000.0 + t,
            )
        })
        .collect()
}

/// Adapter that replays a fixed opinion per bar and enforces time order.
#[derive(Debug, Clone)]
pub struct ScriptedAdapter {
    pub name: String,
    pub script: Vec<StockAction>,
    pub seen: Vec<i64>,
    pub labels: Labels,
}

impl ScriptedAdapter {
    pub fn new(name: &str, script: &[StockAction]) -> Self {
        Self {
            name: name.to_string(),
            script: script.to_vec(),
            seen: Vec::new(),
            labels: Labels::new(),
        }
    }

    pub fn always(name: &str, action: StockAction) -> Self {
        Self::new(name, &[action])
    }
}

impl SignalAdapter for ScriptedAdapter {
    fn name(&self) -> &str {
        &self.name
    }

    fn add_bar(&mut self, bar: &PriceBar) -> Result<(), IndicatorError> {
        if let Some(&previous) = self.seen.last()
            && bar.time <= previous
        {
            return Err(IndicatorError::OutOfOrder {
                previous,
                received: bar.time,
            });
        }
        self.seen.push(bar.time);
        Ok(())
    }

    /// The scripted action for the latest bar; the last entry repeats once
    /// the script runs out.
    fn signal(&self) -> StockAction {
        if self.seen.is_empty() {
            return StockAction::Wait;
        }
        let index = (self.seen.len() - 1).min(self.script.len().saturating_sub(1));
        self.script.get(index).copied().unwrap_or(StockAction::Wait)
    }

    fn fresh(&self, labels: &Labels) -> Self {
        Self {
            labels: labels.clone(),
            ..Self::new(&self.name, &self.script)
        }
    }
}

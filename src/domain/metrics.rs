//! Per-algorithm performance tracking and the summaries derived from it.

use crate::domain::error::IndicatorError;
use crate::domain::ohlcv::PriceBar;
use crate::domain::position::OpenPosition;
use crate::domain::signal::{StockAction, TradingSignal};

/// Positions and running extremes for one algorithm over a backtest run.
#[derive(Debug, Clone, Default)]
pub struct PerformanceMetrics {
    pub trades_closed: usize,
    pub max_profit_seen: Option<f64>,
    pub min_profit_seen: Option<f64>,
    pub active: Vec<OpenPosition>,
    pub completed: Vec<OpenPosition>,
    pub failure: Option<IndicatorError>,
}

impl PerformanceMetrics {
    /// Applies one time step: positions open before this step are advanced
    /// and closed at `track_iterations`, then an actionable `signal` opens a
    /// new position on `bar`. The new position takes its first sample on the
    /// next bar.
    pub fn record(&mut self, signal: TradingSignal, bar: &PriceBar, track_iterations: usize) {
        let mut still_active = Vec::with_capacity(self.active.len() + 1);
        for mut position in std::mem::take(&mut self.active) {
            let record = position.advance(bar);
            self.observe_profit(record.profit);
            if position.is_complete(track_iterations) {
                self.trades_closed += 1;
                self.completed.push(position);
            } else {
                still_active.push(position);
            }
        }
        self.active = still_active;

        if signal.action.is_actionable() {
            self.active.push(OpenPosition::open(*bar, signal));
        }
    }

    fn observe_profit(&mut self, profit: f64) {
        self.max_profit_seen = Some(self.max_profit_seen.map_or(profit, |m| m.max(profit)));
        self.min_profit_seen = Some(self.min_profit_seen.map_or(profit, |m| m.min(profit)));
    }

    pub fn is_disabled(&self) -> bool {
        self.failure.is_some()
    }

    /// Completed positions followed by active ones, which is signal order.
    pub fn positions(&self) -> impl Iterator<Item = &OpenPosition> {
        self.completed.iter().chain(self.active.iter())
    }

    /// One summary per iteration index in `1..=track_iterations`. Indices
    /// without samples report zero trades and zero for every ratio.
    pub fn iteration_summary(&self, track_iterations: usize) -> Vec<IterationSummary> {
        let mut summaries: Vec<IterationSummary> =
            (1..=track_iterations).map(IterationSummary::empty).collect();

        for position in self.positions() {
            for record in &position.iterations {
                let Some(summary) = record
                    .iteration
                    .checked_sub(1)
                    .and_then(|i| summaries.get_mut(i))
                else {
                    continue;
                };
                summary.add(record.profit, position.profit_percent(record.profit));
            }
        }
        for summary in &mut summaries {
            summary.finish();
        }
        summaries
    }
}

/// Aggregate statistics for every position's sample at one iteration index.
#[derive(Debug, Clone, PartialEq)]
pub struct IterationSummary {
    pub iteration: usize,
    pub trades: usize,
    pub wins: usize,
    pub total_profit_pct: f64,
    pub avg_profit_pct: f64,
    pub max_profit_pct: f64,
    pub win_rate: f64,
}

impl IterationSummary {
    fn empty(iteration: usize) -> Self {
        Self {
            iteration,
            trades: 0,
            wins: 0,
            total_profit_pct: 0.0,
            avg_profit_pct: 0.0,
            max_profit_pct: 0.0,
            win_rate: 0.0,
        }
    }

    fn add(&mut self, profit: f64, profit_pct: f64) {
        if self.trades == 0 || profit_pct > self.max_profit_pct {
            self.max_profit_pct = profit_pct;
        }
        self.trades += 1;
        if profit > 0.0 {
            self.wins += 1;
        }
        self.total_profit_pct += profit_pct;
    }

    fn finish(&mut self) {
        if self.trades > 0 {
            let trades = self.trades as f64;
            self.avg_profit_pct = self.total_profit_pct / trades;
            self.win_rate = self.wins as f64 / trades * 100.0;
        }
    }
}

/// A position as it appears in a report.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionRow {
    pub time: i64,
    pub action: StockAction,
    pub closed: bool,
    pub profit_pcts: Vec<f64>,
}

impl PositionRow {
    fn from_position(position: &OpenPosition, closed: bool) -> Self {
        Self {
            time: position.signal.time,
            action: position.signal.action,
            closed,
            profit_pcts: position
                .iterations
                .iter()
                .map(|r| position.profit_percent(r.profit))
                .collect(),
        }
    }
}

/// Everything reported about one algorithm.
#[derive(Debug, Clone, PartialEq)]
pub struct AlgorithmReport {
    pub name: String,
    pub trades_closed: usize,
    pub max_profit_seen: Option<f64>,
    pub min_profit_seen: Option<f64>,
    pub positions: Vec<PositionRow>,
    pub summary: Vec<IterationSummary>,
    pub failure: Option<String>,
}

impl AlgorithmReport {
    pub fn from_metrics(name: &str, metrics: &PerformanceMetrics, track_iterations: usize) -> Self {
        let positions = metrics
            .completed
            .iter()
            .map(|p| PositionRow::from_position(p, true))
            .chain(
                metrics
                    .active
                    .iter()
                    .map(|p| PositionRow::from_position(p, false)),
            )
            .collect();
        Self {
            name: name.to_string(),
            trades_closed: metrics.trades_closed,
            max_profit_seen: metrics.max_profit_seen,
            min_profit_seen: metrics.min_profit_seen,
            positions,
            summary: metrics.iteration_summary(track_iterations),
            failure: metrics.failure.as_ref().map(ToString::to_string),
        }
    }
}

/// Result of a backtest run, one entry per algorithm sorted by name.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestReport {
    pub track_iterations: usize,
    pub bars: usize,
    pub algorithms: Vec<AlgorithmReport>,
}

impl BacktestReport {
    pub fn algorithm(&self, name: &str) -> Option<&AlgorithmReport> {
        self.algorithms.iter().find(|a| a.name == name)
    }
}

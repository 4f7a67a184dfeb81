//! Backtest engine: replays bars through every algorithm and tracks the
//! positions their signals open.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::domain::algorithm::TradingAlgorithm;
use crate::domain::metrics::{AlgorithmReport, BacktestReport, PerformanceMetrics};
use crate::domain::ohlcv::PriceBar;

pub const DEFAULT_TRACK_ITERATIONS: usize = 10;
/// Upper bound accepted from configuration and the command line.
pub const MAX_TRACK_ITERATIONS: usize = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Bars each position is followed for before it is closed.
    pub track_iterations: usize,
    /// Enumerate every non-empty subset of the adapter pool rather than one
    /// algorithm per adapter.
    pub combine: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            track_iterations: DEFAULT_TRACK_ITERATIONS,
            combine: true,
        }
    }
}

pub struct BacktestEngine {
    config: BacktestConfig,
    algorithms: Vec<Box<dyn TradingAlgorithm>>,
    performance: BTreeMap<String, PerformanceMetrics>,
    bars_seen: usize,
}

impl BacktestEngine {
    pub fn new(config: BacktestConfig) -> Self {
        Self {
            config,
            algorithms: Vec::new(),
            performance: BTreeMap::new(),
            bars_seen: 0,
        }
    }

    pub fn config(&self) -> &BacktestConfig {
        &self.config
    }

    pub fn add_algorithm(&mut self, algorithm: Box<dyn TradingAlgorithm>) {
        self.algorithms.push(algorithm);
    }

    pub fn add_algorithms<I>(&mut self, algorithms: I)
    where
        I: IntoIterator<Item = Box<dyn TradingAlgorithm>>,
    {
        self.algorithms.extend(algorithms);
    }

    pub fn algorithm_count(&self) -> usize {
        self.algorithms.len()
    }

    pub fn performance(&self, name: &str) -> Option<&PerformanceMetrics> {
        self.performance.get(name)
    }

    /// Feeds one bar to every algorithm still running. An algorithm whose
    /// evaluation fails is disabled for the rest of the run; its positions
    /// stay as they were.
    pub fn step(&mut self, bar: &PriceBar) {
        self.bars_seen += 1;
        let track = self.config.track_iterations;
        for algorithm in &mut self.algorithms {
            if !self.performance.contains_key(algorithm.name()) {
                self.performance
                    .insert(algorithm.name().to_string(), PerformanceMetrics::default());
            }
            let Some(metrics) = self.performance.get_mut(algorithm.name()) else {
                continue;
            };
            if metrics.is_disabled() {
                continue;
            }
            match algorithm.evaluate(bar) {
                Ok(signal) => {
                    let closed_before = metrics.trades_closed;
                    metrics.record(signal, bar, track);
                    if signal.action.is_actionable() {
                        debug!(
                            algorithm = algorithm.name(),
                            time = bar.time,
                            action = %signal.action,
                            "position opened"
                        );
                    }
                    if metrics.trades_closed > closed_before {
                        debug!(
                            algorithm = algorithm.name(),
                            time = bar.time,
                            closed = metrics.trades_closed - closed_before,
                            "positions closed"
                        );
                    }
                }
                Err(err) => {
                    warn!(
                        algorithm = algorithm.name(),
                        time = bar.time,
                        error = %err,
                        "disabling algorithm"
                    );
                    metrics.failure = Some(err);
                }
            }
        }
    }

    /// Replays `bars` in order and returns the report for the whole run.
    pub fn run(&mut self, bars: &[PriceBar]) -> BacktestReport {
        info!(
            algorithms = self.algorithms.len(),
            bars = bars.len(),
            track_iterations = self.config.track_iterations,
            "starting backtest"
        );
        for bar in bars {
            self.step(bar);
        }
        let report = self.report();
        let disabled = report.algorithms.iter().filter(|a| a.failure.is_some()).count();
        let trades: usize = report.algorithms.iter().map(|a| a.trades_closed).sum();
        info!(trades_closed = trades, disabled, "backtest complete");
        report
    }

    /// Snapshot of every algorithm's performance so far, sorted by name.
    pub fn report(&self) -> BacktestReport {
        let track = self.config.track_iterations;
        let mut algorithms: Vec<AlgorithmReport> = self
            .performance
            .iter()
            .map(|(name, metrics)| AlgorithmReport::from_metrics(name, metrics, track))
            .collect();
        for algorithm in &self.algorithms {
            if !self.performance.contains_key(algorithm.name()) {
                algorithms.push(AlgorithmReport::from_metrics(
                    algorithm.name(),
                    &PerformanceMetrics::default(),
                    track,
                ));
            }
        }
        algorithms.sort_by(|a, b| a.name.cmp(&b.name));
        algorithms.dedup_by(|a, b| a.name == b.name);
        BacktestReport {
            track_iterations: track,
            bars: self.bars_seen,
            algorithms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::error::IndicatorError;
    use crate::domain::signal::{StockAction, TradingSignal};

    /// Emits a scripted action per bar and rejects bars at `fail_at`.
    struct Scripted {
        name: String,
        actions: Vec<StockAction>,
        calls: usize,
        fail_at: Option<i64>,
    }

    impl Scripted {
        fn new(name: &str, actions: &[StockAction]) -> Self {
            Self {
                name: name.to_string(),
                actions: actions.to_vec(),
                calls: 0,
                fail_at: None,
            }
        }
    }

    impl TradingAlgorithm for Scripted {
        fn name(&self) -> &str {
            &self.name
        }

        fn evaluate(&mut self, bar: &PriceBar) -> Result<TradingSignal, IndicatorError> {
            if self.fail_at == Some(bar.time) {
                return Err(IndicatorError::InvalidInput {
                    time: bar.time,
                    reason: "scripted".to_string(),
                });
            }
            let action = self.actions.get(self.calls).copied().unwrap_or(StockAction::Wait);
            self.calls += 1;
            Ok(TradingSignal::new(bar.time, action))
        }
    }

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new(i as i64, c, c, c, c, 0.0))
            .collect()
    }

    fn config(track_iterations: usize) -> BacktestConfig {
        BacktestConfig {
            track_iterations,
            ..BacktestConfig::default()
        }
    }

    #[test]
    fn default_config() {
        let c = BacktestConfig::default();
        assert_eq!(c.track_iterations, 10);
        assert!(c.combine);
    }

    #[test]
    fn position_lifecycle_over_steps() {
        use StockAction::*;
        let mut engine = BacktestEngine::new(config(3));
        engine.add_algorithm(Box::new(Scripted::new("A", &[Buy])));
        let bars = bars(&[100.0, 101.0, 102.0, 103.0, 104.0]);

        engine.step(&bars[0]);
        let perf = engine.performance("A").unwrap();
        assert_eq!(perf.active.len(), 1);
        assert_eq!(perf.active[0].iteration_count, 0);

        for (i, bar) in bars[1..3].iter().enumerate() {
            engine.step(bar);
            let perf = engine.performance("A").unwrap();
            assert_eq!(perf.active.len(), 1);
            assert_eq!(perf.active[0].iteration_count, i + 1);
            assert!(perf.completed.is_empty());
        }

        engine.step(&bars[3]);
        let perf = engine.performance("A").unwrap();
        assert!(perf.active.is_empty());
        assert_eq!(perf.completed.len(), 1);
        assert_eq!(perf.trades_closed, 1);
        assert_eq!(perf.completed[0].iterations.len(), 3);
    }

    #[test]
    fn sell_position_profit_is_inverted() {
        let mut engine = BacktestEngine::new(config(2));
        engine.add_algorithm(Box::new(Scripted::new("S", &[StockAction::Sell])));
        let report = engine.run(&bars(&[100.0, 90.0, 120.0]));

        let algo = report.algorithm("S").unwrap();
        assert_eq!(algo.trades_closed, 1);
        assert_eq!(algo.positions[0].profit_pcts, vec![10.0, -20.0]);
        assert_eq!(algo.max_profit_seen, Some(10.0));
        assert_eq!(algo.min_profit_seen, Some(-20.0));
    }

    #[test]
    fn failing_algorithm_is_disabled_others_continue() {
        use StockAction::*;
        let mut failing = Scripted::new("B", &[Buy, Wait, Wait, Wait]);
        failing.fail_at = Some(2);
        let mut engine = BacktestEngine::new(config(5));
        engine.add_algorithm(Box::new(failing));
        engine.add_algorithm(Box::new(Scripted::new("A", &[Buy])));

        let report = engine.run(&bars(&[100.0, 101.0, 102.0, 103.0]));
        let b = report.algorithm("B").unwrap();
        assert!(b.failure.as_deref().unwrap_or_default().contains("scripted"));
        assert_eq!(b.positions[0].profit_pcts.len(), 1);

        let a = report.algorithm("A").unwrap();
        assert!(a.failure.is_none());
        assert_eq!(a.positions[0].profit_pcts.len(), 3);
    }

    #[test]
    fn report_sorted_and_dense() {
        let mut engine = BacktestEngine::new(config(4));
        engine.add_algorithm(Box::new(Scripted::new("Zeta", &[])));
        engine.add_algorithm(Box::new(Scripted::new("Alpha", &[StockAction::Buy])));

        let report = engine.run(&bars(&[10.0, 11.0]));
        let names: Vec<&str> = report.algorithms.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
        assert_eq!(report.bars, 2);
        for algo in &report.algorithms {
            assert_eq!(algo.summary.len(), 4);
            let indices: Vec<usize> = algo.summary.iter().map(|s| s.iteration).collect();
            assert_eq!(indices, vec![1, 2, 3, 4]);
        }
        assert_eq!(report.algorithms[0].summary[0].trades, 1);
        assert_eq!(report.algorithms[1].summary[0].trades, 0);
    }

    #[test]
    fn report_includes_algorithms_with_no_bars() {
        let mut engine = BacktestEngine::new(config(2));
        engine.add_algorithm(Box::new(Scripted::new("Idle", &[])));
        let report = engine.run(&[]);
        assert_eq!(report.algorithms.len(), 1);
        assert_eq!(report.algorithms[0].trades_closed, 0);
    }
}

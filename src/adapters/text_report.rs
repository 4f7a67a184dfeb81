//! Fixed-width console report.
//!
//! One block per algorithm: the positions it opened with their profit
//! percentage at each tracked iteration, followed by the per-iteration
//! summary rows.

use crate::domain::error::SignalbenchError;
use crate::domain::metrics::{AlgorithmReport, BacktestReport, IterationSummary};
use crate::ports::report_port::ReportPort;

const RULE: &str =
    "|---------------------------------------------------------------------------------------------------\n";

type SummaryValue = fn(&IterationSummary) -> f64;

const SUMMARY_ROWS: [(&str, SummaryValue); 5] = [
    ("Number of Trades", |s| s.trades as f64),
    ("Number of Wins", |s| s.wins as f64),
    ("Avg Profit Percent", |s| s.avg_profit_pct),
    ("Max Profit Percent", |s| s.max_profit_pct),
    ("Win Rate", |s| s.win_rate),
];

#[derive(Debug, Clone, Copy, Default)]
pub struct TextReportAdapter;

impl TextReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

pub fn render_algorithm(algo: &AlgorithmReport, track_iterations: usize) -> String {
    let mut out = String::new();
    out.push_str(&format!("Algorithm: {}\n", algo.name));
    out.push_str("Performance by Iteration:\n");

    out.push_str(&format!("|{:<13} | {:<5} | ", "Position Time", "Signal"));
    for i in 1..=track_iterations {
        out.push_str(&format!("{:>9} | ", i));
    }
    out.push('\n');
    out.push_str(RULE);

    for position in &algo.positions {
        out.push_str(&format!("|{:<13} | {:<5} | ", position.time, position.action.as_str()));
        for pct in &position.profit_pcts {
            out.push_str(&format!("{:<9.2} | ", pct));
        }
        out.push('\n');
    }

    out.push_str(RULE);
    for (label, value) in SUMMARY_ROWS {
        out.push_str(&format!("|{:<21} | ", label));
        for summary in &algo.summary {
            out.push_str(&format!(" {:<9.2} | ", value(summary)));
        }
        out.push('\n');
    }
    out.push_str(RULE);

    out.push_str(&format!("Trades closed: {}", algo.trades_closed));
    if let (Some(max), Some(min)) = (algo.max_profit_seen, algo.min_profit_seen) {
        out.push_str(&format!(", max profit seen: {:.2}, min profit seen: {:.2}", max, min));
    }
    out.push('\n');
    if let Some(failure) = &algo.failure {
        out.push_str(&format!("Disabled: {}\n", failure));
    }
    out.push_str("\n\n");
    out
}

impl ReportPort for TextReportAdapter {
    fn render(&self, report: &BacktestReport) -> Result<String, SignalbenchError> {
        let mut out = format!(
            "Backtest over {} bars, {} algorithms, tracking {} iterations\n\n",
            report.bars,
            report.algorithms.len(),
            report.track_iterations
        );
        for algo in &report.algorithms {
            out.push_str(&render_algorithm(algo, report.track_iterations));
        }
        Ok(out)
    }
}

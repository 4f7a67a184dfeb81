//! CSV report: one row per algorithm and iteration index.

use crate::domain::error::SignalbenchError;
use crate::domain::metrics::BacktestReport;
use crate::ports::report_port::ReportPort;

const HEADER: [&str; 9] = [
    "algorithm",
    "iteration",
    "trades",
    "wins",
    "total_profit_pct",
    "avg_profit_pct",
    "max_profit_pct",
    "win_rate",
    "failure",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvReportAdapter;

impl CsvReportAdapter {
    pub fn new() -> Self {
        Self
    }
}

fn report_err(e: impl std::fmt::Display) -> SignalbenchError {
    SignalbenchError::Report {
        reason: format!("CSV write error: {}", e),
    }
}

impl ReportPort for CsvReportAdapter {
    fn render(&self, report: &BacktestReport) -> Result<String, SignalbenchError> {
        let mut wtr = csv::Writer::from_writer(Vec::new());
        wtr.write_record(HEADER).map_err(report_err)?;
        for algo in &report.algorithms {
            let failure = algo.failure.as_deref().unwrap_or("");
            for s in &algo.summary {
                wtr.write_record([
                    algo.name.clone(),
                    s.iteration.to_string(),
                    s.trades.to_string(),
                    s.wins.to_string(),
                    format!("{:.4}", s.total_profit_pct),
                    format!("{:.4}", s.avg_profit_pct),
                    format!("{:.4}", s.max_profit_pct),
                    format!("{:.2}", s.win_rate),
                    failure.to_string(),
                ])
                .map_err(report_err)?;
            }
        }
        let bytes = wtr.into_inner().map_err(report_err)?;
        String::from_utf8(bytes).map_err(report_err)
    }
}

//! Report generation port trait.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::domain::error::SignalbenchError;
use crate::domain::metrics::BacktestReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Csv,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Text => "text",
            ReportFormat::Csv => "csv",
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(ReportFormat::Text),
            "csv" => Ok(ReportFormat::Csv),
            other => Err(format!("unknown report format '{}', expected text|csv", other)),
        }
    }
}

/// Port for writing backtest reports.
pub trait ReportPort {
    /// Renders `report` into a string.
    fn render(&self, report: &BacktestReport) -> Result<String, SignalbenchError>;

    /// Writes the rendered report to `output`, or stdout when absent.
    fn write(
        &self,
        report: &BacktestReport,
        output: Option<&Path>,
    ) -> Result<(), SignalbenchError> {
        let rendered = self.render(report)?;
        match output {
            Some(path) => std::fs::write(path, rendered).map_err(|e| SignalbenchError::Report {
                reason: format!("failed to write {}: {}", path.display(), e),
            }),
            None => {
                use std::io::Write;
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(rendered.as_bytes())?;
                stdout.flush()?;
                Ok(())
            }
        }
    }
}

//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use tracing::{info, warn};

use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::csv_report::CsvReportAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::prometheus_metrics::{FacadeMetrics, PrometheusRun};
use crate::adapters::text_report::TextReportAdapter;
use crate::domain::adapter::{AdapterPoolConfig, IndicatorAdapter, build_pool};
use crate::domain::algorithm::{CombinationAlgorithm, TradingAlgorithm, combinations, individual};
use crate::domain::backtest::{BacktestConfig, BacktestEngine};
use crate::domain::config_validation::{Settings, load_settings, validate_track_iterations};
use crate::domain::error::SignalbenchError;
use crate::domain::metrics::BacktestReport;
use crate::logging::{LogConfig, init_logging};
use crate::ports::data_port::DataPort;
use crate::ports::metrics_port::{Labels, MetricsScope};
use crate::ports::report_port::{ReportFormat, ReportPort};

#[derive(Parser, Debug)]
#[command(name = "signalbench", about = "Backtest indicator signal combinations")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        format: Option<ReportFormat>,
        #[arg(long)]
        track_iterations: Option<usize>,
    },
    /// Copy a CSV export of bars into the cache for the configured request
    Import {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        input: PathBuf,
    },
    /// List the algorithms the configured adapter pool produces
    Algorithms {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            output,
            format,
            track_iterations,
        } => run_backtest(&config, output, format, track_iterations),
        Command::Import { config, input } => run_import(&config, &input),
        Command::Algorithms { config } => run_algorithms(&config),
        Command::Validate { config } => run_validate(&config),
    };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(&err)
        }
    }
}

fn setup_logging(config: &FileConfigAdapter) -> Result<(), SignalbenchError> {
    let log_config = LogConfig::from_config(config)?;
    if let Err(e) = init_logging(&log_config) {
        eprintln!("warning: logging not initialized: {e}");
    }
    Ok(())
}

fn run_backtest(
    config_path: &Path,
    output: Option<PathBuf>,
    format: Option<ReportFormat>,
    track_iterations: Option<usize>,
) -> Result<(), SignalbenchError> {
    let config = FileConfigAdapter::from_file(config_path)?;
    setup_logging(&config)?;
    info!(config = %config_path.display(), "loaded config");

    let mut settings = load_settings(&config)?;
    if let Some(n) = track_iterations {
        settings.backtest.track_iterations = validate_track_iterations(n)?;
    }
    if let Some(format) = format {
        settings.report.format = format;
    }
    if output.is_some() {
        settings.report.output = output;
    }

    let data = CsvAdapter::new(settings.data_dir.clone());
    let report = match &settings.metrics.prometheus_output {
        Some(path) => {
            let run = PrometheusRun::new();
            let scope = MetricsScope::new(Arc::new(FacadeMetrics::new()), Labels::new());
            let report = run.record(|| run_backtest_pipeline(&settings, &data, &scope))?;
            run.write(path)?;
            info!(path = %path.display(), "metrics written");
            report
        }
        None => run_backtest_pipeline(&settings, &data, &MetricsScope::noop())?,
    };

    let reporter: Box<dyn ReportPort> = match settings.report.format {
        ReportFormat::Text => Box::new(TextReportAdapter::new()),
        ReportFormat::Csv => Box::new(CsvReportAdapter::new()),
    };
    reporter.write(&report, settings.report.output.as_deref())?;
    if let Some(path) = &settings.report.output {
        eprintln!("Report written to: {}", path.display());
    }
    Ok(())
}

/// Builds the algorithms `pool` describes: every non-empty subset when
/// `backtest.combine` is set, otherwise one per adapter.
pub fn build_algorithms(
    pool: &AdapterPoolConfig,
    backtest: &BacktestConfig,
    metrics: &MetricsScope,
) -> Vec<CombinationAlgorithm<IndicatorAdapter>> {
    let adapters = build_pool(pool, metrics);
    if backtest.combine {
        combinations(&adapters, metrics)
    } else {
        individual(&adapters, metrics)
    }
}

/// Loads the configured bars and replays them through every algorithm.
pub fn run_backtest_pipeline(
    settings: &Settings,
    data: &dyn DataPort,
    metrics: &MetricsScope,
) -> Result<BacktestReport, SignalbenchError> {
    let bars = data.fetch_bars(&settings.request)?;
    let algorithms = build_algorithms(&settings.adapters, &settings.backtest, metrics);
    if algorithms.is_empty() {
        warn!("adapter pool produced no algorithms");
    }

    let mut engine = BacktestEngine::new(settings.backtest.clone());
    engine.add_algorithms(
        algorithms
            .into_iter()
            .map(|a| Box::new(a) as Box<dyn TradingAlgorithm>),
    );
    Ok(engine.run(&bars))
}

fn run_import(config_path: &Path, input: &Path) -> Result<(), SignalbenchError> {
    let config = FileConfigAdapter::from_file(config_path)?;
    setup_logging(&config)?;
    let settings = load_settings(&config)?;
    let path = CsvAdapter::new(settings.data_dir.clone()).import(&settings.request, input)?;
    eprintln!("Imported {} into {}", input.display(), path.display());
    Ok(())
}

fn run_algorithms(config_path: &Path) -> Result<(), SignalbenchError> {
    let config = FileConfigAdapter::from_file(config_path)?;
    setup_logging(&config)?;
    let settings = load_settings(&config)?;
    let algorithms = build_algorithms(
        &settings.adapters,
        &settings.backtest,
        &MetricsScope::noop(),
    );
    for algorithm in &algorithms {
        println!("{}", algorithm.name());
    }
    eprintln!("{} algorithms", algorithms.len());
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), SignalbenchError> {
    eprintln!("Loading config from {}", config_path.display());
    let config = FileConfigAdapter::from_file(config_path)?;
    LogConfig::from_config(&config)?;
    let settings = load_settings(&config)?;
    eprintln!("Config validated successfully");
    eprintln!(
        "  data:     {} {} {} from {} to {} in {}",
        settings.request.ticker,
        settings.request.interval,
        settings.request.timespan,
        settings.request.start_date,
        settings.request.end_date,
        settings.data_dir.display()
    );
    eprintln!(
        "  backtest: track_iterations={} combine={}",
        settings.backtest.track_iterations, settings.backtest.combine
    );
    let enabled: Vec<&str> = settings.adapters.enabled.iter().map(|k| k.as_str()).collect();
    eprintln!("  adapters: {}", enabled.join(", "));
    eprintln!("  report:   {}", settings.report.format);
    if let Some(path) = &settings.metrics.prometheus_output {
        eprintln!("  metrics:  {}", path.display());
    }
    Ok(())
}

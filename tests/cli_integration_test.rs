//! CLI integration tests: real INI files and CSV caches on disk.

mod common;

use clap::Parser;
use common::*;
use signalbench::adapters::csv_adapter::CsvAdapter;
use signalbench::adapters::file_config_adapter::FileConfigAdapter;
use signalbench::cli::{self, Cli, Command};
use signalbench::domain::backtest::MAX_TRACK_ITERATIONS;
use signalbench::domain::config_validation::load_settings;
use signalbench::domain::error::SignalbenchError;
use std::io::Write;
use std::path::Path;
use std::process::ExitCode;

fn write_temp_ini(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

fn ini(data_dir: &Path) -> String {
    format!(
        r#"
[data]
dir = {}
ticker = WAVE
interval = 1
timespan = day
start_date = 2024-01-01
end_date = 2024-06-30

[backtest]
track_iterations = 3
combine = true

[adapters]
enabled = supertrend, bollinger
bollinger_period = 10

[logging]
level = warn
format = compact
"#,
        data_dir.display()
    )
}

fn config_error() -> ExitCode {
    ExitCode::from(&SignalbenchError::ConfigInvalid {
        section: String::new(),
        key: String::new(),
        reason: String::new(),
    })
}

// ExitCode has no PartialEq; compare the debug form.
fn same_code(a: ExitCode, b: ExitCode) -> bool {
    format!("{:?}", a) == format!("{:?}", b)
}

fn run(args: &[&str]) -> ExitCode {
    cli::run(Cli::parse_from(std::iter::once("signalbench").chain(args.iter().copied())))
}

fn seeded_cache() -> tempfile::TempDir {
    let dir = tempfile::TempDir::new().unwrap();
    let config = FileConfigAdapter::from_string(&ini(dir.path())).unwrap();
    let settings = load_settings(&config).unwrap();
    CsvAdapter::new(dir.path().to_path_buf())
        .save_bars(&settings.request, &wave_bars(90))
        .unwrap();
    dir
}

mod parsing {
    use super::*;

    #[test]
    fn subcommands_parse() {
        let cli = Cli::parse_from(["signalbench", "validate", "-c", "a.ini"]);
        assert!(matches!(cli.command, Command::Validate { .. }));
        let cli = Cli::parse_from(["signalbench", "algorithms", "--config", "a.ini"]);
        assert!(matches!(cli.command, Command::Algorithms { .. }));
        let cli = Cli::parse_from(["signalbench", "import", "-c", "a.ini", "-i", "bars.csv"]);
        assert!(matches!(cli.command, Command::Import { .. }));
    }

    #[test]
    fn bad_format_is_rejected_by_parser() {
        let result = Cli::try_parse_from(["signalbench", "backtest", "-c", "a.ini", "-f", "pdf"]);
        assert!(result.is_err());
    }
}

mod commands {
    use super::*;

    #[test]
    fn validate_accepts_good_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = write_temp_ini(&ini(dir.path()));
        let code = run(&["validate", "--config", file.path().to_str().unwrap()]);
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn validate_reports_config_errors() {
        let file =
            write_temp_ini("[data]\nticker = A\nstart_date = 2024-13-01\nend_date = 2024-01-01\n");
        let code = run(&["validate", "--config", file.path().to_str().unwrap()]);
        assert!(same_code(code, config_error()));
    }

    #[test]
    fn missing_config_file_fails() {
        let code = run(&["validate", "--config", "/nonexistent/signalbench.ini"]);
        assert!(!same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn backtest_writes_csv_report() {
        let dir = seeded_cache();
        let file = write_temp_ini(&ini(dir.path()));
        let out = dir.path().join("summary.csv");
        let code = run(&[
            "backtest",
            "--config",
            file.path().to_str().unwrap(),
            "--format",
            "csv",
            "--output",
            out.to_str().unwrap(),
            "--track-iterations",
            "2",
        ]);
        assert!(same_code(code, ExitCode::SUCCESS));

        let content = std::fs::read_to_string(&out).unwrap();
        // header + 3 algorithms x 2 iterations
        assert_eq!(content.lines().count(), 7);
        assert!(content.contains("SuperTrend_10_3.00_Bollinger_10_L(5),2,"));
    }

    #[test]
    fn backtest_writes_text_report() {
        let dir = seeded_cache();
        let file = write_temp_ini(&ini(dir.path()));
        let out = dir.path().join("summary.txt");
        let code = run(&[
            "backtest",
            "-c",
            file.path().to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ]);
        assert!(same_code(code, ExitCode::SUCCESS));

        let content = std::fs::read_to_string(&out).unwrap();
        assert!(content.contains("Algorithm: Bollinger_10_L(5)\n"));
        assert!(content.contains("|Position Time | Signal |         1 |         2 |         3 | \n"));
    }

    #[test]
    fn backtest_without_cached_data_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = write_temp_ini(&ini(dir.path()));
        let code = run(&["backtest", "-c", file.path().to_str().unwrap()]);
        let no_data = SignalbenchError::NoData {
            ticker: String::new(),
            start: String::new(),
            end: String::new(),
        };
        assert!(same_code(code, ExitCode::from(&no_data)));
    }

    #[test]
    fn track_iterations_override_is_bounded() {
        let dir = seeded_cache();
        let file = write_temp_ini(&ini(dir.path()));
        let too_many = (MAX_TRACK_ITERATIONS + 1).to_string();
        for n in ["0", too_many.as_str(), "18446744073709551615"] {
            let code = run(&[
                "backtest",
                "-c",
                file.path().to_str().unwrap(),
                "--track-iterations",
                n,
            ]);
            assert!(same_code(code, config_error()), "accepted {}", n);
        }
    }

    #[test]
    fn import_then_backtest() {
        let dir = tempfile::TempDir::new().unwrap();
        let export = dir.path().join("export.csv");
        let mut rows = String::from("Time,Open,High,Low,Close,Volume\n");
        for b in wave_bars(40) {
            let time = chrono::DateTime::<chrono::Utc>::from_timestamp_millis(b.time).unwrap();
            rows.push_str(&format!(
                "{},{},{},{},{},{}\n",
                time.to_rfc3339(),
                b.open,
                b.high,
                b.low,
                b.close,
                b.volume
            ));
        }
        std::fs::write(&export, rows).unwrap();
        let file = write_temp_ini(&ini(dir.path()));
        let config = file.path().to_str().unwrap();

        let code = run(&["import", "-c", config, "-i", export.to_str().unwrap()]);
        assert!(same_code(code, ExitCode::SUCCESS));
        assert!(dir.path().join("WAVE_2024-01-01_to_2024-06-30_1_day.csv").exists());

        let out = dir.path().join("summary.csv");
        let code = run(&["backtest", "-c", config, "-f", "csv", "-o", out.to_str().unwrap()]);
        assert!(same_code(code, ExitCode::SUCCESS));
    }

    #[test]
    fn backtest_writes_prometheus_metrics() {
        let dir = seeded_cache();
        let metrics_path = dir.path().join("signalbench.prom");
        let content = format!(
            "{}\n[metrics]\nprometheus_output = {}\n",
            ini(dir.path()),
            metrics_path.display()
        );
        let file = write_temp_ini(&content);
        let out = dir.path().join("summary.txt");
        let code = run(&["backtest", "-c", file.path().to_str().unwrap(), "-o", out.to_str().unwrap()]);
        assert!(same_code(code, ExitCode::SUCCESS));

        let metrics = std::fs::read_to_string(&metrics_path).unwrap();
        assert!(metrics.contains("algorithm_signals_generated{"));
        assert!(metrics.contains("bollinger_signals_generated{"));
    }
}

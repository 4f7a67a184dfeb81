//! Logging setup on `tracing`.
//!
//! Output formats:
//! - **pretty**: multi-line, human readable
//! - **compact**: one line per event
//! - **json**: one JSON object per event, for log collectors
//!
//! Logs go to stderr so reports on stdout stay clean. `RUST_LOG`, when set,
//! overrides the configured level.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::domain::error::SignalbenchError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Pretty,
    #[default]
    Compact,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogConfig {
    /// Filter directive, e.g. "info" or "signalbench=debug".
    pub level: String,
    pub format: LogFormat,
    pub with_target: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            with_target: false,
        }
    }
}

impl LogConfig {
    pub fn new(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Reads the `[logging]` section. Absent keys keep their defaults.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, SignalbenchError> {
        const SECTION: &str = "logging";
        let mut log = Self::default();
        if let Some(level) = config.get_string(SECTION, "level") {
            EnvFilter::try_new(&level)
                .map_err(|e| SignalbenchError::invalid(SECTION, "level", e.to_string()))?;
            log.level = level;
        }
        if let Some(format) = config.get_string(SECTION, "format") {
            log.format = format
                .parse()
                .map_err(|reason: String| SignalbenchError::invalid(SECTION, "format", reason))?;
        }
        Ok(log)
    }
}

/// Installs the global subscriber. Fails if one is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&config.level))?;

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .pretty()
                .with_writer(std::io::stderr)
                .with_target(config.with_target);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Compact => {
            let fmt_layer = fmt::layer()
                .compact()
                .with_writer(std::io::stderr)
                .with_target(config.with_target);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_target(config.with_target);
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    tracing::debug!(format = ?config.format, level = %config.level, "logging initialized");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    #[test]
    fn log_format_from_str() {
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("compact".parse::<LogFormat>().unwrap(), LogFormat::Compact);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn builder() {
        let config = LogConfig::new("debug").with_format(LogFormat::Json);
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn from_config_section() {
        let ini =
            FileConfigAdapter::from_string("[logging]\nlevel = signalbench=debug\nformat = json\n")
                .unwrap();
        let config = LogConfig::from_config(&ini).unwrap();
        assert_eq!(config.level, "signalbench=debug");
        assert_eq!(config.format, LogFormat::Json);
    }

    #[test]
    fn from_config_defaults() {
        let ini = FileConfigAdapter::from_string("[data]\nticker = A\n").unwrap();
        assert_eq!(LogConfig::from_config(&ini).unwrap(), LogConfig::default());
    }

    #[test]
    fn from_config_rejects_bad_format() {
        let ini = FileConfigAdapter::from_string("[logging]\nformat = xml\n").unwrap();
        assert!(matches!(
            LogConfig::from_config(&ini),
            Err(SignalbenchError::ConfigInvalid { .. })
        ));
    }
}

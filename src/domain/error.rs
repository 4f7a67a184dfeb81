//! Domain error types.

/// A bar rejected by a single indicator or adapter instance. The instance's
/// state is left untouched when one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum IndicatorError {
    #[error("bar at {received} is not after the last seen bar at {previous}")]
    OutOfOrder { previous: i64, received: i64 },

    #[error("invalid bar at {time}: {reason}")]
    InvalidInput { time: i64, reason: String },
}

/// Top-level error type for signalbench.
#[derive(Debug, thiserror::Error)]
pub enum SignalbenchError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no cached data for {ticker} between {start} and {end}")]
    NoData {
        ticker: String,
        start: String,
        end: String,
    },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SignalbenchError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SignalbenchError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn missing(section: &str, key: &str) -> Self {
        SignalbenchError::ConfigMissing {
            section: section.to_string(),
            key: key.to_string(),
        }
    }
}

impl From<&SignalbenchError> for std::process::ExitCode {
    fn from(err: &SignalbenchError) -> Self {
        let code: u8 = match err {
            SignalbenchError::Io(_) => 1,
            SignalbenchError::ConfigParse { .. }
            | SignalbenchError::ConfigMissing { .. }
            | SignalbenchError::ConfigInvalid { .. } => 2,
            SignalbenchError::Data { .. } | SignalbenchError::NoData { .. } => 3,
            SignalbenchError::Report { .. } => 4,
            SignalbenchError::Indicator(_) => 5,
        };
        std::process::ExitCode::from(code)
    }
}

/// Structured logging for the CDEWS client
///
/// Every message is tagged with the data source it concerns (reports feed,
/// predict endpoint, geolocation, ...) and, where there is one, a subject id
/// such as a report id or crop name. Messages go through the `log` facade;
/// `init_logger` installs an `env_logger` backend writing to stderr or to a
/// log file.

use chrono::Utc;
use log::LevelFilter;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;

use crate::model::{FetchError, SubmitError};

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// Parses "debug", "info", "warn"/"warning", "error" (case-insensitive).
    pub fn parse(s: &str) -> Option<LogLevel> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }

    fn filter(self) -> LevelFilter {
        match self {
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Warning => LevelFilter::Warn,
            LogLevel::Error => LevelFilter::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Reports,
    Predict,
    Geolocation,
    Assistant,
    Planner,
    Map,
    Config,
    System,
}

impl DataSource {
    /// `log` target used for records from this source.
    pub fn target(&self) -> &'static str {
        match self {
            DataSource::Reports => "cdews::reports",
            DataSource::Predict => "cdews::predict",
            DataSource::Geolocation => "cdews::geo",
            DataSource::Assistant => "cdews::chat",
            DataSource::Planner => "cdews::planner",
            DataSource::Map => "cdews::map",
            DataSource::Config => "cdews::config",
            DataSource::System => "cdews::sys",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Reports => write!(f, "REPORTS"),
            DataSource::Predict => write!(f, "PREDICT"),
            DataSource::Geolocation => write!(f, "GEO"),
            DataSource::Assistant => write!(f, "CHAT"),
            DataSource::Planner => write!(f, "PLAN"),
            DataSource::Map => write!(f, "MAP"),
            DataSource::Config => write!(f, "CFG"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - user input or user decision (no image, GPS denied)
    Expected,
    /// Unexpected failure - service degradation or a contract change
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Setup
// ---------------------------------------------------------------------------

/// Install the global logger.
///
/// `RUST_LOG` still applies on top of `min_level`. When `log_file` is given
/// records are appended there instead of stderr; if the file cannot be
/// opened, stderr is used and the failure is reported there. Calling this
/// more than once is harmless (later calls are ignored).
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(min_level.filter())
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {} {}: {}",
                Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
                record.level(),
                record.target(),
                record.args()
            )
        });

    if let Some(path) = log_file {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => {
                builder.target(env_logger::Target::Pipe(Box::new(file)));
            }
            Err(e) => eprintln!("Failed to open log file {}: {}", path, e),
        }
    }

    let _ = builder.try_init();
}

fn subject_prefix(subject_id: Option<&str>) -> String {
    subject_id.map(|s| format!("[{}] ", s)).unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: DataSource, subject_id: Option<&str>, message: &str) {
    log::info!(target: source.target(), "{}{}", subject_prefix(subject_id), message);
}

/// Log a warning message
pub fn warn(source: DataSource, subject_id: Option<&str>, message: &str) {
    log::warn!(target: source.target(), "{}{}", subject_prefix(subject_id), message);
}

/// Log an error message
pub fn error(source: DataSource, subject_id: Option<&str>, message: &str) {
    log::error!(target: source.target(), "{}{}", subject_prefix(subject_id), message);
}

/// Log a debug message
pub fn debug(source: DataSource, subject_id: Option<&str>, message: &str) {
    log::debug!(target: source.target(), "{}{}", subject_prefix(subject_id), message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a reports-feed failure.
pub fn classify_fetch_failure(err: &FetchError) -> FailureType {
    match err {
        // Backend not running is routine during development
        FetchError::Network(_) => FailureType::Unknown,
        // HTTP errors and bad bodies point at the service or an API change
        FetchError::Http(_) | FetchError::Parse(_) => FailureType::Unexpected,
        FetchError::Io(_) => FailureType::Unknown,
    }
}

/// Classify a submission failure.
pub fn classify_submit_failure(err: &SubmitError) -> FailureType {
    match err {
        SubmitError::Validation(_) | SubmitError::Permission(_) => FailureType::Expected,
        SubmitError::Network(_) => FailureType::Unexpected,
        SubmitError::Server { .. } => FailureType::Unknown,
    }
}

fn log_classified(source: DataSource, subject_id: Option<&str>, failure: FailureType, message: &str) {
    match failure {
        FailureType::Expected => debug(source, subject_id, message),
        FailureType::Unexpected => error(source, subject_id, message),
        FailureType::Unknown => warn(source, subject_id, message),
    }
}

// ---------------------------------------------------------------------------
// Structured Failure Logging
// ---------------------------------------------------------------------------

/// Log a reports-feed failure with automatic classification
pub fn log_fetch_failure(operation: &str, err: &FetchError) {
    let failure_type = classify_fetch_failure(err);
    let message = format!("{} failed [{}]: {}", operation, failure_type, err);
    log_classified(DataSource::Reports, None, failure_type, &message);
}

/// Log a submission failure with automatic classification
pub fn log_submit_failure(attempt: u64, err: &SubmitError) {
    let failure_type = classify_submit_failure(err);
    let subject = format!("attempt-{}", attempt);
    let message = format!("submission failed [{}]: {}", failure_type, err);
    log_classified(DataSource::Predict, Some(&subject), failure_type, &message);
}

// ---------------------------------------------------------------------------
// Fetch Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of one reports fetch
pub fn log_fetch_summary(accepted: usize, rejected: usize) {
    let total = accepted + rejected;
    let message = format!(
        "Fetch complete: {}/{} reports accepted, {} rejected",
        accepted, total, rejected
    );

    if rejected == 0 {
        info(DataSource::Reports, None, &message);
    } else if accepted == 0 {
        error(DataSource::Reports, None, &message);
    } else {
        warn(DataSource::Reports, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PermissionError, ValidationError};

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warning));
        assert_eq!(LogLevel::parse(" info "), Some(LogLevel::Info));
        assert_eq!(LogLevel::parse("verbose"), None);
    }

    #[test]
    fn test_failure_classification() {
        assert_eq!(
            classify_fetch_failure(&FetchError::Network("connection refused".into())),
            FailureType::Unknown
        );
        assert_eq!(classify_fetch_failure(&FetchError::Http(500)), FailureType::Unexpected);
        assert_eq!(
            classify_submit_failure(&SubmitError::Permission(PermissionError::Denied)),
            FailureType::Expected
        );
        assert_eq!(
            classify_submit_failure(&SubmitError::Validation(ValidationError::NoImageSelected)),
            FailureType::Expected
        );
    }
}

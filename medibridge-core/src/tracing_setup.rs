//! Tracing setup for MediBridge clients
//!
//! Console output follows the level the user picked; a trace-level copy of
//! every run is written to disk for later inspection.

use std::fs::{File, create_dir_all};
use std::path::{Path, PathBuf};

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

const LOG_FILE_NAME: &str = "medibridge-last-run.log";

/// Initialize tracing with a console layer and a full trace log file.
///
/// # Arguments
/// * `console_level` - Log level for console output; `RUST_LOG` overrides it
/// * `logs_dir` - Directory for the run log (defaults to "./logs")
///
/// The log file is `medibridge-last-run.log` and is replaced on each run.
///
/// # Errors
///
/// - `std::io::Error` - If the logs directory or log file cannot be created
pub fn init_tracing(console_level: Level, logs_dir: Option<&Path>) -> std::io::Result<PathBuf> {
    let logs_path = logs_dir.unwrap_or_else(|| Path::new("logs"));
    create_dir_all(logs_path)?;

    let log_file_path = logs_path.join(LOG_FILE_NAME);
    let log_file = File::create(&log_file_path)?;

    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(console_level.to_string()));

    // Console goes to stderr so command output on stdout stays pipeable
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(console_filter);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(log_file)
        .with_filter(EnvFilter::new("trace"));

    // A second init in the same process (tests) keeps the first subscriber
    let _ = tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init();

    tracing::debug!(
        "Tracing initialized: console={}, debug_file={}",
        console_level,
        log_file_path.display()
    );

    Ok(log_file_path)
}

/// CLI log levels for user control
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CliLogLevel {
    /// Only error messages
    Error,
    /// Warning and error messages
    Warn,
    /// Informational, warning, and error messages
    Info,
    /// Debug, informational, warning, and error messages
    Debug,
    /// All messages including detailed tracing
    Trace,
}

impl CliLogLevel {
    /// Converts CLI log level to tracing Level enum.
    ///
    /// # Examples
    /// ```
    /// use medibridge_core::tracing_setup::CliLogLevel;
    ///
    /// let level = CliLogLevel::Warn.as_tracing_level();
    /// assert_eq!(level, tracing::Level::WARN);
    /// ```
    pub fn as_tracing_level(self) -> Level {
        match self {
            CliLogLevel::Error => Level::ERROR,
            CliLogLevel::Warn => Level::WARN,
            CliLogLevel::Info => Level::INFO,
            CliLogLevel::Debug => Level::DEBUG,
            CliLogLevel::Trace => Level::TRACE,
        }
    }
}

impl std::fmt::Display for CliLogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliLogLevel::Error => write!(f, "error"),
            CliLogLevel::Warn => write!(f, "warn"),
            CliLogLevel::Info => write!(f, "info"),
            CliLogLevel::Debug => write!(f, "debug"),
            CliLogLevel::Trace => write!(f, "trace"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_writes_log_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = init_tracing(Level::WARN, Some(dir.path())).unwrap();

        assert_eq!(path, dir.path().join(LOG_FILE_NAME));
        assert!(path.exists());
    }

    #[test]
    fn test_level_display_matches_filter_syntax() {
        assert_eq!(CliLogLevel::Info.to_string(), "info");
        assert_eq!(CliLogLevel::Trace.as_tracing_level(), Level::TRACE);
    }
}

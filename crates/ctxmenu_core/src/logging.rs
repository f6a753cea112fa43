//! Tracing setup for the ctxmenu binary and tests.
//!
//! Output goes to the console, and additionally to a daily rolling file in
//! `<data dir>/logs` unless stdout is an interactive terminal. When the file
//! cannot be opened the console keeps working on its own.
//!
//! Filter priority: explicit filter (config or caller) > `CTXMENU_LOG` >
//! `RUST_LOG` > build-type default.

use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;

/// Environment variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "CTXMENU_LOG";

/// Where log lines are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    Console,
    /// Console plus a daily rolling file in the directory.
    ConsoleAndFile(PathBuf),
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LogConfig {
    pub output: LogOutput,
    /// Overrides the environment and the build default when set.
    pub filter: Option<String>,
}

impl LogConfig {
    /// File logging into `log_dir`, unless stdout is a terminal.
    pub fn new(log_dir: PathBuf) -> Self {
        let output = if atty::is(atty::Stream::Stdout) {
            LogOutput::Console
        } else {
            LogOutput::ConsoleAndFile(log_dir)
        };
        Self { output, filter: None }
    }

    /// Console-only logging.
    pub fn console() -> Self {
        Self { output: LogOutput::Console, filter: None }
    }

    /// Settings taken from the persisted application config.
    pub fn from_app_config(config: &AppConfig) -> Self {
        let mut log_config = Self::new(log_dir());
        log_config.filter = config.log_filter.clone();
        log_config
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Keeps the file writer alive; dropping it flushes pending lines.
pub struct LoggingGuard {
    _worker_guard: Option<WorkerGuard>,
}

/// Install the global subscriber.
///
/// A subscriber that is already installed (tests, embedding hosts) is left
/// in place.
pub fn init_logging(config: LogConfig) -> LoggingGuard {
    let filter = build_env_filter(config.filter.as_deref());

    let file = match &config.output {
        LogOutput::Console => None,
        LogOutput::ConsoleAndFile(dir) => match open_log_file(dir) {
            Ok(writer) => Some(writer),
            Err(e) => {
                eprintln!("Warning: file logging unavailable ({e}), logging to console only");
                None
            }
        },
    };

    let console_layer = fmt::layer().with_ansi(true).with_target(file.is_some());

    let worker_guard = match file {
        Some((writer, guard)) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true);
            let _ = tracing_subscriber::registry()
                .with(filter)
                .with(console_layer)
                .with(file_layer)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = tracing_subscriber::registry().with(filter).with(console_layer).try_init();
            None
        }
    };

    tracing::debug!(output = ?config.output, "Logging initialized");
    LoggingGuard { _worker_guard: worker_guard }
}

/// Initialize with defaults.
pub fn init_logging_default() -> LoggingGuard {
    init_logging(LogConfig::new(log_dir()))
}

fn open_log_file(
    dir: &std::path::Path,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("ctxmenu")
        .filename_suffix("log")
        .build(dir)?;
    Ok(tracing_appender::non_blocking(appender))
}

fn build_env_filter(custom: Option<&str>) -> EnvFilter {
    if let Some(filter) = custom {
        match EnvFilter::try_new(filter) {
            Ok(filter) => return filter,
            Err(e) => eprintln!("Warning: invalid log filter '{filter}' ({e}), using default"),
        }
        return EnvFilter::new(default_log_filter());
    }

    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_log_filter()))
}

/// Default filter for the current build type.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "debug,ctxmenu=trace,ctxmenu_core=trace,ctxmenu_ui=trace"
    } else {
        "info"
    }
}

/// `<data dir>/logs`.
pub fn log_dir() -> PathBuf {
    crate::config::default_data_dir().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_filter_wins() {
        let filter = build_env_filter(Some("warn,ctxmenu_ui=debug"));
        assert!(filter.to_string().contains("ctxmenu_ui=debug"));
    }

    #[test]
    fn test_app_config_filter_is_carried() {
        let config = AppConfig { log_filter: Some("ctxmenu_ui=trace".to_string()), ..Default::default() };
        let log_config = LogConfig::from_app_config(&config);
        assert_eq!(log_config.filter.as_deref(), Some("ctxmenu_ui=trace"));
        assert!(log_dir().ends_with("logs"));
    }

    #[test]
    fn test_console_init_is_repeatable() {
        let _first = init_logging(LogConfig::console().with_filter("warn"));
        let _second = init_logging(LogConfig::console());
    }
}

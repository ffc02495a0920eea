//! Logging setup for yggctl binaries and embedders
//!
//! Everything logs through `tracing`; this module only installs the
//! subscriber. The filter comes from `YGGCTL_LOG` (same syntax as
//! `RUST_LOG`) unless a preset overrides it.

use std::fs::OpenOptions;
use std::path::PathBuf;

use tracing_subscriber::{
    fmt::{self, writer::BoxMakeWriter},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::{paths, Result, YggctlError};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "YGGCTL_LOG";

/// Where log lines go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogOutput {
    /// Standard error; stdout is reserved for payloads
    Stderr,
    /// Append to a file, `None` meaning the default state-dir log file
    File(Option<PathBuf>),
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub output: LogOutput,
    /// `EnvFilter` directives, e.g. `warn,yggctl_client=debug`
    pub filter: String,
    /// Prefix lines with source file and line
    pub source_locations: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: filter_from_env("info"),
            source_locations: false,
        }
    }
}

impl LogConfig {
    /// Quiet stderr logging for the command line tool
    pub fn cli() -> Self {
        Self {
            filter: filter_from_env("warn"),
            ..Self::default()
        }
    }

    /// File logging for long-running programs that embed a session
    pub fn file() -> Self {
        Self {
            output: LogOutput::File(None),
            source_locations: true,
            ..Self::default()
        }
    }

    /// Everything from the yggctl crates, with source locations
    pub fn development() -> Self {
        Self {
            output: LogOutput::Stderr,
            filter: "yggctl_client=trace,yggctl_cli=debug,debug".into(),
            source_locations: true,
        }
    }

    /// Override the filter, e.g. from a `--verbose` flag
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = filter.into();
        self
    }
}

fn filter_from_env(default: &str) -> String {
    std::env::var(LOG_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| default.into())
}

/// Initialize logging with default configuration
pub fn init_logging() -> Result<()> {
    init_logging_with_config(LogConfig::default())
}

/// Install the global subscriber described by `config`
///
/// Fails with `Config` for a bad filter, `FileWrite` when the log file
/// cannot be opened, and `Internal` if a subscriber is already installed.
pub fn init_logging_with_config(config: LogConfig) -> Result<()> {
    let filter = EnvFilter::try_new(&config.filter)
        .map_err(|e| YggctlError::config(format!("Invalid log filter '{}': {}", config.filter, e)))?;

    let (writer, ansi) = match &config.output {
        LogOutput::Stderr => (BoxMakeWriter::new(std::io::stderr), true),
        LogOutput::File(path) => (BoxMakeWriter::new(open_log_file(path.clone())?), false),
    };

    let layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_file(config.source_locations)
        .with_line_number(config.source_locations);

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()
        .map_err(|e| YggctlError::internal(format!("Failed to init logging: {}", e)))
}

fn open_log_file(path: Option<PathBuf>) -> Result<std::fs::File> {
    let path = path.unwrap_or_else(paths::log_file);
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| YggctlError::FileWrite {
            path: dir.to_path_buf(),
            source: e,
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| YggctlError::FileWrite { path, source: e })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_preset_logs_to_stderr() {
        let config = LogConfig::cli();
        assert_eq!(config.output, LogOutput::Stderr);
        assert!(!config.source_locations);
    }

    #[test]
    fn test_file_preset_uses_default_path() {
        let config = LogConfig::file();
        assert_eq!(config.output, LogOutput::File(None));
        assert!(config.source_locations);
    }

    #[test]
    fn test_development_preset_is_verbose() {
        let config = LogConfig::development();
        assert!(config.filter.contains("yggctl_client=trace"));
        assert!(EnvFilter::try_new(&config.filter).is_ok());
    }

    #[test]
    fn test_with_filter() {
        let config = LogConfig::cli().with_filter("yggctl_client=trace");
        assert_eq!(config.filter, "yggctl_client=trace");
    }

    #[test]
    fn test_open_log_file_creates_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("yggctl.log");

        open_log_file(Some(path.clone())).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_invalid_filter_is_config_error() {
        let config = LogConfig::cli().with_filter("yggctl=notalevel");
        let err = init_logging_with_config(config).unwrap_err();
        assert!(matches!(err, YggctlError::Config(_)));
    }
}

//! yggctl-utils: Common utilities shared across yggctl crates
//!
//! This crate provides:
//! - Unified error types ([`YggctlError`], [`Result`])
//! - Logging infrastructure ([`init_logging`], [`LogConfig`])
//! - Client configuration loading ([`Config`])
//! - Config and log file locations ([`paths`] module)

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

// Re-export main types at crate root for convenience
pub use config::{Config, DEFAULT_ENDPOINT, ENDPOINT_ENV};
pub use error::{Result, YggctlError};
pub use logging::{init_logging, init_logging_with_config, LogConfig, LogOutput};

// Re-export the file locations
pub use paths::{config_file, log_file};

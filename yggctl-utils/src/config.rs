//! Client configuration loading
//!
//! Reads `~/.config/yggctl/config.toml`:
//!
//! ```toml
//! endpoint = "tcp://localhost:9001"
//! timeout_secs = 5
//! keepalive = false
//!
//! [remotes]
//! gateway = "tcp://[200:1::1]:9001"
//! local = "unix:///var/run/yggdrasil.sock"
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use crate::{paths, Result, YggctlError};

/// Admin endpoint used when nothing else is configured
pub const DEFAULT_ENDPOINT: &str = "tcp://localhost:9001";

/// Environment variable overriding the configured endpoint
pub const ENDPOINT_ENV: &str = "YGGCTL_ENDPOINT";

/// Prefix marking an endpoint as an alias from `[remotes]`
const REMOTE_PREFIX: char = '@';

/// Client configuration
#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default)]
pub struct Config {
    /// Admin socket address (`tcp://host:port`, `unix:///path` or `@alias`)
    pub endpoint: String,
    /// Per-call timeout in seconds; no bound when unset
    pub timeout_secs: Option<u64>,
    /// Keep one connection open across calls (default: one per call)
    pub keepalive: bool,
    /// Named endpoints, referenced as `@name`
    pub remotes: HashMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            timeout_secs: None,
            keepalive: false,
            remotes: HashMap::new(),
        }
    }
}

impl Config {
    /// Load from the default config file location
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_file())
    }

    /// Load from the default location, falling back to defaults on any problem
    pub fn load_or_default() -> Self {
        match Self::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config file: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Load from a specific file; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| YggctlError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        toml::from_str(&content).map_err(|e| YggctlError::ConfigInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Per-call timeout, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Pick the endpoint to connect to
    ///
    /// An explicit request wins over the configured endpoint. `@name` is
    /// looked up in `[remotes]`.
    pub fn resolve_endpoint(&self, requested: Option<&str>) -> Result<String> {
        let endpoint = requested.unwrap_or(&self.endpoint);

        match endpoint.strip_prefix(REMOTE_PREFIX) {
            Some(name) => self
                .remotes
                .get(name)
                .cloned()
                .ok_or_else(|| YggctlError::config(format!("Unknown remote '{}'", name))),
            None => Ok(endpoint.to_string()),
        }
    }
}

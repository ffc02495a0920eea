//! Per-session behaviour shared by the blocking and async sessions

use std::time::Duration;

use yggctl_utils::Config;

/// Session behaviour
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    /// Default bound for each call (connect, write and read together)
    pub timeout: Option<Duration>,
    /// Keep the connection open between calls
    ///
    /// Off by default: routers may hang up after each reply, so every call
    /// opens its own connection unless this is set.
    pub keepalive: bool,
    /// Connect on first use; otherwise calls on a closed session fail with
    /// `NotConnected`
    pub auto_connect: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: None,
            keepalive: false,
            auto_connect: true,
        }
    }
}

impl SessionOptions {
    /// Options from the loaded client configuration
    pub fn from_config(config: &Config) -> Self {
        Self {
            timeout: config.timeout(),
            keepalive: config.keepalive,
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_keepalive(mut self, keepalive: bool) -> Self {
        self.keepalive = keepalive;
        self
    }

    pub fn with_auto_connect(mut self, auto_connect: bool) -> Self {
        self.auto_connect = auto_connect;
        self
    }
}

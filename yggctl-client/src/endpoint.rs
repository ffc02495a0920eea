//! Admin socket addresses
//!
//! The router's admin socket listens either on TCP (`tcp://localhost:9001`
//! by default) or on a Unix socket (`unix:///var/run/yggdrasil.sock`).

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use url::{Host, Url};
use yggctl_protocol::{DEFAULT_HOST, DEFAULT_PORT};
use yggctl_utils::{Result, YggctlError};

/// Where a session connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Tcp { host: String, port: u16 },
    Unix(PathBuf),
}

impl Default for Endpoint {
    fn default() -> Self {
        Self::tcp(DEFAULT_HOST, DEFAULT_PORT)
    }
}

impl Endpoint {
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Self::Tcp {
            host: host.into(),
            port,
        }
    }

    pub fn unix(path: impl Into<PathBuf>) -> Self {
        Self::Unix(path.into())
    }

    /// Parse an endpoint address
    ///
    /// Accepts `tcp://host[:port]`, `unix:///path`, a bare `host[:port]`, or
    /// a bare absolute/relative filesystem path. A missing port defaults to
    /// 9001.
    pub fn parse(addr: &str) -> Result<Self> {
        let addr = addr.trim();
        if addr.is_empty() {
            return Err(YggctlError::config("Empty endpoint address"));
        }

        if addr.starts_with("unix://") {
            let url = Url::parse(addr)
                .map_err(|e| YggctlError::config(format!("Invalid Unix URL '{}': {}", addr, e)))?;
            if url.path().is_empty() {
                return Err(YggctlError::config(format!("Missing path in Unix URL '{}'", addr)));
            }
            return Ok(Self::unix(url.path()));
        }

        if addr.starts_with('/') || addr.starts_with('.') {
            return Ok(Self::unix(addr));
        }

        let url = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("tcp://{}", addr)
        };
        let url = Url::parse(&url)
            .map_err(|e| YggctlError::config(format!("Invalid TCP URL '{}': {}", addr, e)))?;

        if url.scheme() != "tcp" {
            return Err(YggctlError::config(format!(
                "Unsupported endpoint scheme '{}'",
                url.scheme()
            )));
        }

        let host = match url.host() {
            Some(Host::Domain(domain)) => domain.to_string(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => ip.to_string(),
            None => {
                return Err(YggctlError::config(format!("Missing host in TCP URL '{}'", addr)))
            }
        };

        Ok(Self::tcp(host, url.port().unwrap_or(DEFAULT_PORT)))
    }
}

impl FromStr for Endpoint {
    type Err = YggctlError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp { host, port } if host.contains(':') => write!(f, "tcp://[{}]:{}", host, port),
            Self::Tcp { host, port } => write!(f, "tcp://{}:{}", host, port),
            Self::Unix(path) => write!(f, "unix://{}", path.display()),
        }
    }
}

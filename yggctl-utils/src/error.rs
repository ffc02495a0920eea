//! Error types for yggctl
//!
//! Provides a unified error type used across all yggctl crates. Variants
//! fall into three groups that callers can tell apart: failures reported by
//! the router itself, transport faults, and local encoding/decoding faults.

use std::path::PathBuf;

/// Main error type for yggctl operations
#[derive(Debug, thiserror::Error)]
pub enum YggctlError {
    // === Remote Errors ===

    /// The router understood the request and rejected it
    #[error("Admin API error: {0}")]
    Api(String),

    // === Connection Errors ===

    #[error("Admin API unreachable at {endpoint}: {source}")]
    Unreachable {
        endpoint: String,
        source: std::io::Error,
    },

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Connection closed unexpectedly")]
    ConnectionClosed,

    #[error("Session is not connected")]
    NotConnected,

    #[error("Request timed out after {millis}ms")]
    Timeout { millis: u64 },

    // === Protocol Errors ===

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Cannot encode argument '{key}': {message}")]
    Encoding { key: String, message: String },

    // === IO Errors ===

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    // === Configuration Errors ===

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration at {path}: {message}")]
    ConfigInvalid { path: PathBuf, message: String },

    // === Internal Errors ===

    #[error("Internal error: {0}")]
    Internal(String),
}

impl YggctlError {
    /// Create an API error carrying the router's message
    pub fn api(msg: impl Into<String>) -> Self {
        Self::Api(msg.into())
    }

    /// Create a connection error
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create a protocol error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create an encoding error for an argument
    pub fn encoding(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Encoding {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    pub fn timeout(elapsed: std::time::Duration) -> Self {
        Self::Timeout {
            millis: elapsed.as_millis() as u64,
        }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The router's message, if the router rejected the request
    pub fn api_message(&self) -> Option<&str> {
        match self {
            Self::Api(message) => Some(message),
            _ => None,
        }
    }

    /// Check if the router reported this failure
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Api(_))
    }

    /// Check if this is a transport fault (the session is closed afterwards)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Unreachable { .. }
                | Self::Connection(_)
                | Self::ConnectionClosed
                | Self::NotConnected
                | Self::Timeout { .. }
                | Self::Io(_)
        )
    }

    /// Check if local or remote data could not be encoded or decoded
    pub fn is_local(&self) -> bool {
        matches!(self, Self::Protocol(_) | Self::Encoding { .. })
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Result type alias using YggctlError
pub type Result<T> = std::result::Result<T, YggctlError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    // ==================== Display Tests ====================

    #[test]
    fn test_error_display_api() {
        let err = YggctlError::api("unknown command");
        assert_eq!(err.to_string(), "Admin API error: unknown command");
    }

    #[test]
    fn test_error_display_unreachable() {
        let err = YggctlError::Unreachable {
            endpoint: "tcp://localhost:9001".into(),
            source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"),
        };
        let msg = err.to_string();
        assert!(msg.contains("unreachable"));
        assert!(msg.contains("tcp://localhost:9001"));
    }

    #[test]
    fn test_error_display_connection() {
        let err = YggctlError::connection("broken pipe");
        assert_eq!(err.to_string(), "Connection failed: broken pipe");
    }

    #[test]
    fn test_error_display_connection_closed() {
        assert_eq!(
            YggctlError::ConnectionClosed.to_string(),
            "Connection closed unexpectedly"
        );
    }

    #[test]
    fn test_error_display_timeout() {
        let err = YggctlError::timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Request timed out after 1500ms");
    }

    #[test]
    fn test_error_display_encoding() {
        let err = YggctlError::encoding("coords", "key must be a string");
        assert_eq!(
            err.to_string(),
            "Cannot encode argument 'coords': key must be a string"
        );
    }

    #[test]
    fn test_error_display_config_invalid() {
        let err = YggctlError::ConfigInvalid {
            path: PathBuf::from("/home/user/.config/yggctl/config.toml"),
            message: "expected a string".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Invalid configuration"));
        assert!(msg.contains("config.toml"));
    }

    // ==================== Classification Tests ====================

    #[test]
    fn test_api_message() {
        assert_eq!(YggctlError::api("nope").api_message(), Some("nope"));
        assert_eq!(YggctlError::ConnectionClosed.api_message(), None);
    }

    #[test]
    fn test_classification_is_disjoint() {
        let errors = [
            YggctlError::api("x"),
            YggctlError::connection("x"),
            YggctlError::ConnectionClosed,
            YggctlError::NotConnected,
            YggctlError::timeout(Duration::from_secs(1)),
            YggctlError::protocol("x"),
            YggctlError::encoding("k", "x"),
        ];

        for err in errors {
            let groups = [err.is_remote(), err.is_transport(), err.is_local()];
            assert_eq!(
                groups.iter().filter(|g| **g).count(),
                1,
                "Expected {:?} to belong to exactly one group",
                err
            );
        }
    }

    #[test]
    fn test_is_timeout() {
        assert!(YggctlError::timeout(Duration::from_secs(1)).is_timeout());
        assert!(!YggctlError::ConnectionClosed.is_timeout());
    }

    // ==================== From Trait Tests ====================

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "not found");
        let err: YggctlError = io_err.into();
        assert!(matches!(err, YggctlError::Io(_)));
        assert!(err.is_transport());
    }
}

//! Mapping of codec and socket faults onto `YggctlError`

use std::io;
use std::time::Duration;

use yggctl_protocol::CodecError;
use yggctl_utils::YggctlError;

use crate::Endpoint;

/// Classify a codec failure
///
/// Request-side encoding problems keep their argument key; everything else
/// the codec reports is a malformed reply, except I/O underneath `Framed`.
pub(crate) fn codec_error(err: CodecError, timeout: Option<Duration>) -> YggctlError {
    match err {
        CodecError::Encoding { key, message } => YggctlError::Encoding { key, message },
        CodecError::Io(e) => transport_error(e, timeout),
        other => YggctlError::protocol(other.to_string()),
    }
}

/// Classify a read/write failure on an established connection
pub(crate) fn transport_error(err: io::Error, timeout: Option<Duration>) -> YggctlError {
    match err.kind() {
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock => {
            YggctlError::timeout(timeout.unwrap_or_default())
        }
        io::ErrorKind::UnexpectedEof => YggctlError::ConnectionClosed,
        _ => YggctlError::connection(err.to_string()),
    }
}

/// Classify a failure to establish the connection
///
/// A connect that runs out of a call's time budget is a timeout; any other
/// failure means the admin socket cannot be reached.
pub(crate) fn connect_error(
    endpoint: &Endpoint,
    err: io::Error,
    timeout: Option<Duration>,
) -> YggctlError {
    match (err.kind(), timeout) {
        (io::ErrorKind::TimedOut, Some(timeout)) => YggctlError::timeout(timeout),
        _ => YggctlError::Unreachable {
            endpoint: endpoint.to_string(),
            source: err,
        },
    }
}

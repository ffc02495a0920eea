//! Blocking admin API session
//!
//! Each call owns the calling thread until the reply arrives, the socket
//! fails, or the call's time budget runs out.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use serde_json::{Map, Value};
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use yggctl_protocol::{Arguments, JsonLineCodec, Request, Response};
use yggctl_utils::{Result, YggctlError};

use crate::error::{codec_error, connect_error, transport_error};
use crate::observer::{ObserverId, ResponseObserver, Tracker};
use crate::{Endpoint, SessionOptions};

const READ_CHUNK: usize = 8 * 1024;

/// A socket the blocking session can drive
pub trait BlockingStream: Read + Write + Send {
    /// Bound the next reads and writes; `None` blocks indefinitely
    fn set_io_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl BlockingStream for TcpStream {
    fn set_io_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }
}

#[cfg(unix)]
impl BlockingStream for UnixStream {
    fn set_io_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)?;
        self.set_write_timeout(timeout)
    }
}

/// One open connection with its partial-read buffer
struct Connection {
    stream: Box<dyn BlockingStream>,
    buffer: BytesMut,
    codec: JsonLineCodec,
}

impl Connection {
    fn new(stream: Box<dyn BlockingStream>) -> Self {
        Self {
            stream,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            codec: JsonLineCodec::new(),
        }
    }

    fn open(endpoint: &Endpoint, deadline: Option<Instant>) -> io::Result<Self> {
        let stream: Box<dyn BlockingStream> = match endpoint {
            Endpoint::Tcp { host, port } => Box::new(connect_tcp(host, *port, deadline)?),
            #[cfg(unix)]
            Endpoint::Unix(path) => Box::new(UnixStream::connect(path)?),
            #[cfg(not(unix))]
            Endpoint::Unix(_) => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "Unix sockets are not supported on this platform",
                ))
            }
        };
        Ok(Self::new(stream))
    }

    /// Write one request frame and read until one reply frame decodes
    fn round_trip(
        &mut self,
        frame: &[u8],
        deadline: Option<Instant>,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        self.stream
            .set_io_timeout(time_left(deadline).map_err(|e| transport_error(e, timeout))?)
            .map_err(|e| transport_error(e, timeout))?;
        self.stream
            .write_all(frame)
            .and_then(|_| self.stream.flush())
            .map_err(|e| transport_error(e, timeout))?;
        trace!("Request frame written ({} bytes)", frame.len());

        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(response) = self
                .codec
                .decode(&mut self.buffer)
                .map_err(|e| codec_error(e, timeout))?
            {
                return Ok(response);
            }

            self.stream
                .set_io_timeout(time_left(deadline).map_err(|e| transport_error(e, timeout))?)
                .map_err(|e| transport_error(e, timeout))?;

            match self.stream.read(&mut chunk) {
                Ok(0) => {
                    trace!("Peer closed the connection");
                    return match self
                        .codec
                        .decode_eof(&mut self.buffer)
                        .map_err(|e| codec_error(e, timeout))?
                    {
                        Some(response) => Ok(response),
                        None => Err(YggctlError::ConnectionClosed),
                    };
                }
                Ok(n) => {
                    trace!("Read {} bytes", n);
                    self.buffer.extend_from_slice(&chunk[..n]);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(transport_error(e, timeout)),
            }
        }
    }
}

fn connect_tcp(host: &str, port: u16, deadline: Option<Instant>) -> io::Result<TcpStream> {
    let mut last_err = None;

    for addr in (host, port).to_socket_addrs()? {
        let attempt = match time_left(deadline)? {
            Some(left) => TcpStream::connect_timeout(&addr, left),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => {
                stream.set_nodelay(true)?;
                return Ok(stream);
            }
            Err(e) => last_err = Some(e),
        }
    }

    Err(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("{} did not resolve to any address", host),
        )
    }))
}

/// Time remaining before `deadline`; an expired deadline is a timeout
fn time_left(deadline: Option<Instant>) -> io::Result<Option<Duration>> {
    match deadline {
        None => Ok(None),
        Some(deadline) => match deadline.checked_duration_since(Instant::now()) {
            Some(left) if !left.is_zero() => Ok(Some(left)),
            _ => Err(io::Error::new(io::ErrorKind::TimedOut, "deadline elapsed")),
        },
    }
}

/// Blocking session over one admin socket connection
///
/// Calls take `&mut self`, so one session serves one exchange at a time.
/// Share a session between threads behind a `Mutex`, or open one session per
/// thread.
///
/// During a call the connection is moved out of the session and put back
/// only after a complete reply has been consumed. Any transport fault,
/// malformed reply, or timeout therefore leaves the session closed; the next
/// call reconnects (or fails with `NotConnected` when auto-connect is off).
pub struct Session {
    endpoint: Endpoint,
    options: SessionOptions,
    connection: Option<Connection>,
    tracker: Tracker,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_options(Endpoint::default(), SessionOptions::default())
    }
}

impl Session {
    /// Create a session for a TCP admin socket; nothing is connected yet
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self::with_options(Endpoint::tcp(host, port), SessionOptions::default())
    }

    pub fn with_options(endpoint: Endpoint, options: SessionOptions) -> Self {
        Self {
            endpoint,
            options,
            connection: None,
            tracker: Tracker::default(),
        }
    }

    /// Adopt an already-open stream
    ///
    /// `endpoint` is used if the session has to reconnect later; `options`
    /// apply to the adopted connection as to any other.
    pub fn from_stream<S: BlockingStream + 'static>(
        endpoint: Endpoint,
        options: SessionOptions,
        stream: S,
    ) -> Self {
        let mut session = Self::with_options(endpoint, options);
        session.connection = Some(Connection::new(Box::new(stream)));
        session
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Open the connection
    ///
    /// Does nothing when already connected. Bounded by the session's default
    /// timeout, if any.
    pub fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let deadline = self.options.timeout.map(|t| Instant::now() + t);
        let connection = Connection::open(&self.endpoint, deadline).map_err(|e| {
            YggctlError::Unreachable {
                endpoint: self.endpoint.to_string(),
                source: e,
            }
        })?;
        debug!("Connected to {}", self.endpoint);
        self.connection = Some(connection);
        Ok(())
    }

    /// Release the connection; safe to call repeatedly
    pub fn close(&mut self) {
        if self.connection.take().is_some() {
            debug!("Closed connection to {}", self.endpoint);
        }
    }

    /// Invoke an administrative operation and return its payload
    pub fn call(&mut self, operation: &str, arguments: Arguments) -> Result<Value> {
        let timeout = self.options.timeout;
        self.exchange(operation, arguments, timeout)
    }

    /// Like [`Session::call`], bounded by `timeout` instead of the default
    pub fn call_with_timeout(
        &mut self,
        operation: &str,
        arguments: Arguments,
        timeout: Duration,
    ) -> Result<Value> {
        self.exchange(operation, arguments, Some(timeout))
    }

    fn exchange(
        &mut self,
        operation: &str,
        arguments: Arguments,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let started = Instant::now();
        let deadline = timeout.map(|t| started + t);

        // Encode before touching the connection so bad arguments leave it open
        let mut frame = BytesMut::new();
        JsonLineCodec::new()
            .encode(Request::with_arguments(operation, arguments), &mut frame)
            .map_err(|e| codec_error(e, timeout))?;

        let mut connection = match self.connection.take() {
            Some(connection) => connection,
            None if self.options.auto_connect => Connection::open(&self.endpoint, deadline)
                .map_err(|e| connect_error(&self.endpoint, e, timeout))?,
            None => return Err(YggctlError::NotConnected),
        };

        let response = match connection.round_trip(&frame, deadline, timeout) {
            Ok(response) => response,
            Err(e) => {
                debug!(operation, error = %e, "Exchange failed, connection closed");
                return Err(e);
            }
        };

        debug!(
            operation,
            elapsed_ms = started.elapsed().as_micros() as f64 / 1000.0,
            success = response.is_success(),
            "Admin API exchange"
        );

        if self.options.keepalive {
            self.connection = Some(connection);
        }

        match response {
            Response::Success { payload } => {
                self.tracker.record(operation, &payload);
                Ok(payload)
            }
            Response::Failure { message } => Err(YggctlError::Api(message)),
        }
    }

    /// Run `observer` after every successful call of `operation`
    pub fn add_observer<O: ResponseObserver + 'static>(
        &mut self,
        operation: impl Into<String>,
        observer: O,
    ) -> ObserverId {
        self.tracker.add(operation, Box::new(observer))
    }

    /// Unregister an observer; false if it was already gone
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.tracker.remove(id)
    }

    /// Merge of every object payload received by this session
    pub fn snapshot(&self) -> &Map<String, Value> {
        self.tracker.snapshot()
    }

    pub fn clear_snapshot(&mut self) {
        self.tracker.clear_snapshot()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("endpoint", &self.endpoint)
            .field("options", &self.options)
            .field("connected", &self.is_connected())
            .field("tracker", &self.tracker)
            .finish()
    }
}

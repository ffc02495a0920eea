//! Async admin API session
//!
//! Same contract as [`crate::blocking::Session`], with every socket wait
//! yielding to the tokio scheduler instead of blocking the thread.

use std::time::{Duration, Instant};

use futures::{SinkExt, StreamExt};
use serde_json::{Map, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;
use tokio_util::codec::Framed;
use tracing::debug;

use yggctl_protocol::{Arguments, JsonLineCodec, Request, Response};
use yggctl_utils::{Result, YggctlError};

use crate::error::{codec_error, connect_error};
use crate::observer::{ObserverId, ResponseObserver, Tracker};
use crate::{Endpoint, SessionOptions};

/// Trait alias for streams that can be used with Framed
pub trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}
impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

type Connection = Framed<Box<dyn AsyncStream>, JsonLineCodec>;

async fn open(endpoint: &Endpoint) -> std::io::Result<Connection> {
    let stream: Box<dyn AsyncStream> = match endpoint {
        Endpoint::Tcp { host, port } => {
            let stream = TcpStream::connect((host.as_str(), *port)).await?;
            stream.set_nodelay(true)?;
            Box::new(stream)
        }
        #[cfg(unix)]
        Endpoint::Unix(path) => Box::new(UnixStream::connect(path).await?),
        #[cfg(not(unix))]
        Endpoint::Unix(_) => {
            return Err(std::io::Error::new(
                std::io::ErrorKind::Unsupported,
                "Unix sockets are not supported on this platform",
            ))
        }
    };
    Ok(Framed::new(stream, JsonLineCodec::new()))
}

/// Async session over one admin socket connection
///
/// Calls take `&mut self`, so exchanges on one session never overlap; other
/// tasks keep running while a call waits on the socket. Wrap the session in a
/// `tokio::sync::Mutex` to share it between tasks.
///
/// The connection is moved into each call and handed back only after a
/// complete reply. If the call future is dropped (cancelled, or cut short by
/// a timeout) the connection is dropped with it and the session is left
/// closed, so a half-read reply can never leak into the next call.
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
    pub fn from_stream<S: AsyncStream + 'static>(
        endpoint: Endpoint,
        options: SessionOptions,
        stream: S,
    ) -> Self {
        let mut session = Self::with_options(endpoint, options);
        let stream: Box<dyn AsyncStream> = Box::new(stream);
        session.connection = Some(Framed::new(stream, JsonLineCodec::new()));
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
    pub async fn connect(&mut self) -> Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }

        let connecting = open(&self.endpoint);
        let result = match self.options.timeout {
            Some(timeout) => match tokio::time::timeout(timeout, connecting).await {
                Ok(result) => result,
                Err(_) => Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "connect timed out",
                )),
            },
            None => connecting.await,
        };

        let connection = result.map_err(|e| YggctlError::Unreachable {
            endpoint: self.endpoint.to_string(),
            source: e,
        })?;
        debug!("Connected to {}", self.endpoint);
        self.connection = Some(connection);
        Ok(())
    }

    /// Release the connection; safe to call repeatedly
    pub async fn close(&mut self) {
        if let Some(mut connection) = self.connection.take() {
            // The socket is released on drop even if the flush fails
            if let Err(e) = connection.close().await {
                debug!(error = %e, "Flush on close to {} failed", self.endpoint);
            }
            debug!("Closed connection to {}", self.endpoint);
        }
    }

    /// Invoke an administrative operation and return its payload
    pub async fn call(&mut self, operation: &str, arguments: Arguments) -> Result<Value> {
        let timeout = self.options.timeout;
        self.exchange(operation, arguments, timeout).await
    }

    /// Like [`Session::call`], bounded by `timeout` instead of the default
    pub async fn call_with_timeout(
        &mut self,
        operation: &str,
        arguments: Arguments,
        timeout: Duration,
    ) -> Result<Value> {
        self.exchange(operation, arguments, Some(timeout)).await
    }

    async fn exchange(
        &mut self,
        operation: &str,
        arguments: Arguments,
        timeout: Option<Duration>,
    ) -> Result<Value> {
        let started = Instant::now();
        let request = Request::with_arguments(operation, arguments);

        // Validate before touching the connection so bad arguments leave it open
        request.to_value().map_err(|e| codec_error(e, timeout))?;

        let connection = self.connection.take();
        let round_trip = round_trip(
            connection,
            &self.endpoint,
            self.options.auto_connect,
            request,
            timeout,
        );
        let result = match timeout {
            Some(limit) => tokio::time::timeout(limit, round_trip)
                .await
                .unwrap_or_else(|_| Err(YggctlError::timeout(limit))),
            None => round_trip.await,
        };

        let (connection, response) = match result {
            Ok(exchanged) => exchanged,
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

/// Connect if needed, send one request, and wait for one reply
///
/// Owns the connection for the whole exchange and returns it only on
/// success.
async fn round_trip(
    connection: Option<Connection>,
    endpoint: &Endpoint,
    auto_connect: bool,
    request: Request,
    timeout: Option<Duration>,
) -> Result<(Connection, Response)> {
    let mut connection = match connection {
        Some(connection) => connection,
        None if auto_connect => open(endpoint)
            .await
            .map_err(|e| connect_error(endpoint, e, timeout))?,
        None => return Err(YggctlError::NotConnected),
    };

    connection
        .send(request)
        .await
        .map_err(|e| codec_error(e, timeout))?;

    match connection.next().await {
        Some(Ok(response)) => Ok((connection, response)),
        Some(Err(e)) => Err(codec_error(e, timeout)),
        None => Err(YggctlError::ConnectionClosed),
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

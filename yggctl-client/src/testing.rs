//! Stub admin socket used by the session tests
//!
//! Runs on plain threads so both the blocking and the async session can be
//! pointed at it.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::Value;

use crate::Endpoint;

/// What the stub does with one request
pub(crate) enum Reply {
    /// Send the value followed by a newline
    Json(Value),
    /// Send the value followed by a newline, then hang up
    Final(Value),
    /// Send these bytes as-is
    Raw(Vec<u8>),
    /// Never answer; hold the connection until the client goes away
    Hang,
    /// Drop the connection without answering
    Close,
}

type Handler = dyn Fn(&Value) -> Reply + Send + Sync;

pub(crate) struct StubServer {
    addr: SocketAddr,
    received: Arc<Mutex<Vec<u8>>>,
    connections: Arc<AtomicUsize>,
}

impl StubServer {
    pub(crate) fn spawn<F>(handler: F) -> Self
    where
        F: Fn(&Value) -> Reply + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let received = Arc::new(Mutex::new(Vec::new()));
        let connections = Arc::new(AtomicUsize::new(0));
        let handler: Arc<Handler> = Arc::new(handler);

        let received_clone = received.clone();
        let connections_clone = connections.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                connections_clone.fetch_add(1, Ordering::SeqCst);
                let handler = handler.clone();
                let received = received_clone.clone();
                thread::spawn(move || serve(stream, handler, received));
            }
        });

        Self {
            addr,
            received,
            connections,
        }
    }

    pub(crate) fn endpoint(&self) -> Endpoint {
        Endpoint::tcp(self.addr.ip().to_string(), self.addr.port())
    }

    /// Every request byte the stub has read so far
    pub(crate) fn received(&self) -> Vec<u8> {
        self.received.lock().unwrap().clone()
    }

    pub(crate) fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

fn serve(stream: TcpStream, handler: Arc<Handler>, received: Arc<Mutex<Vec<u8>>>) {
    let mut writer = stream.try_clone().unwrap();
    let mut reader = BufReader::new(stream);

    loop {
        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) | Err(_) => return,
            Ok(_) => {}
        }
        received.lock().unwrap().extend_from_slice(line.as_bytes());

        let request: Value = serde_json::from_str(&line).unwrap_or(Value::Null);
        match handler(&request) {
            Reply::Json(value) => {
                if writer.write_all(&line_of(&value)).is_err() {
                    return;
                }
            }
            Reply::Final(value) => {
                let _ = writer.write_all(&line_of(&value));
                let _ = writer.shutdown(Shutdown::Both);
                return;
            }
            Reply::Raw(data) => {
                if writer.write_all(&data).is_err() {
                    return;
                }
            }
            Reply::Hang => {
                let mut sink = Vec::new();
                let _ = reader.read_to_end(&mut sink);
                return;
            }
            Reply::Close => return,
        }
    }
}

fn line_of(value: &Value) -> Vec<u8> {
    let mut data = serde_json::to_vec(value).unwrap();
    data.push(b'\n');
    data
}

/// A reply in the router's success shape
pub(crate) fn success(payload: Value) -> Reply {
    Reply::Json(serde_json::json!({"status": "success", "response": payload}))
}

/// A reply in the router's error shape
pub(crate) fn failure(message: &str) -> Reply {
    Reply::Json(serde_json::json!({"status": "error", "error": message}))
}

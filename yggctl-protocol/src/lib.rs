//! yggctl-protocol: Wire definitions for the Yggdrasil admin socket
//!
//! This crate defines the request/response model used to talk to a running
//! Yggdrasil router over its admin socket, and the codec that turns those
//! messages into newline-delimited JSON frames and back. It performs no
//! socket I/O of its own.

pub mod codec;
pub mod messages;

// Re-export main types at crate root
pub use codec::{decode, encode, CodecError, JsonLineCodec, MAX_FRAME_SIZE};
pub use messages::{Arguments, Request, Response};

/// Key naming the requested operation in a request frame
pub const REQUEST_KEY: &str = "request";

/// Status value the router reports for a successful operation
pub const STATUS_SUCCESS: &str = "success";

/// Host the router's admin socket listens on by default
pub const DEFAULT_HOST: &str = "localhost";

/// Port the router's admin socket listens on by default
pub const DEFAULT_PORT: u16 = 9001;

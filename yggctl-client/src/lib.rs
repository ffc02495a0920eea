//! yggctl-client: Sessions for the Yggdrasil admin API
//!
//! Two session types share one contract:
//! - [`blocking::Session`] waits on the socket on the calling thread
//! - [`aio::Session`] runs on tokio and yields while waiting
//!
//! Each session keeps at most one connection, performs one request/response
//! exchange at a time, and turns router failures into
//! [`YggctlError::Api`]. Named accessors such as `get_self()` or
//! `add_peer(uri)` exist on both types; [`records`] decodes the keyed
//! payloads they return.

pub mod aio;
pub mod blocking;
pub mod endpoint;
mod error;
pub mod observer;
pub mod operations;
pub mod options;
pub mod records;

#[cfg(test)]
mod testing;

pub use endpoint::Endpoint;
pub use observer::{CallbackObserver, ObserverId, ResponseObserver};
pub use operations::OPERATIONS;
pub use options::SessionOptions;
pub use records::{format_bytes, keyed_records, transit_traffic, Record, Traffic};

pub use yggctl_protocol::{Arguments, Response};
pub use yggctl_utils::{Result, YggctlError};

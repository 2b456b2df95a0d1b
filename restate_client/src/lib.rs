//! Blocking and async clients for calling handlers on a durable-execution
//! ingress over HTTP.
//!
//! ```no_run
//! use restate_client::Client;
//! use serde_json::{json, Value};
//!
//! let client = Client::new("http://localhost:9070")?;
//! let book: Value = client
//!     .service("gutenberg")
//!     .handler("fetch_title")
//!     .call(&json!({"id": 42}))?;
//! # Ok::<(), restate_client::Error>(())
//! ```

pub mod async_client;
pub mod client;
pub mod config;
pub mod invoker;
pub mod router;
pub mod transport;

#[cfg(test)]
mod testing;

pub use async_client::*;
pub use client::*;
pub use config::*;
pub use invoker::*;
pub use router::*;
pub use transport::*;

pub use restate_protocol::{
    Error, ErrorKind, HandlerCall, RemoteError, Result, SendOptions, SendReceipt, SerializeType,
};

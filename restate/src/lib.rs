//! Facade over the ingress protocol and clients.
//!
//! `client.service("gutenberg").handler("fetch_title").call(&payload)` on a
//! [`Client`] blocks; the same chain on an [`AsyncClient`] returns a
//! [`CallFuture`].

pub use restate_client::*;
pub use restate_protocol::{
    Metadata, Method, Request, CONTENT_TYPE_JSON, CONTENT_TYPE_MSGPACK, IDEMPOTENCY_KEY_HEADER,
};

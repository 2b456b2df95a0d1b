//! Wire contract shared by the blocking and async ingress clients.
//!
//! Nothing in this crate performs I/O: it turns handler calls into
//! [`Request`]s, encodes and decodes payloads, and defines the [`Error`]
//! every operation reports.

pub mod call;
pub mod codec;
pub mod error;
pub mod message;

pub use call::*;
pub use codec::*;
pub use error::*;
pub use message::*;

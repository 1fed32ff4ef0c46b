//! the node channel protocol.
//!
//! messages exchanged between the master and its nodes over a single
//! bidirectional channel: a registration handshake authenticated by the
//! node's pre-shared secret, full-document configuration pushes with
//! apply acknowledgments, and traffic telemetry flowing back.
//!
//! frames are JSON text; the compiled configuration document is carried
//! opaquely as [`serde_json::value::RawValue`] so the master's compiler
//! output reaches the node byte-for-byte.

#![warn(missing_docs)]

mod error;
mod message;

pub use error::Error;
pub use message::{ClientCounters, MasterFrame, NodeFrame};

/// result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

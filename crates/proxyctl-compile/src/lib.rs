//! the pure core of the control plane: config compilation and drift
//! detection.
//!
//! - [`compiler`]: turns relational records into the engine's native
//!   configuration document for one node
//! - [`drift`]: compares an expected document against a node's actually
//!   running one and reports divergence
//!
//! neither module performs I/O; callers supply the records and receive
//! values. both are safe to call concurrently for different nodes.

#![warn(missing_docs)]

mod compiler;
mod drift;
mod error;

pub use compiler::{
    CompiledConfig, InboundStanza, OutboundStanza, RoutingSection, RuleStanza, compile,
    compile_inbound, compile_outbound, compile_rule,
};
pub use drift::{BUILTIN_OUTBOUND_TAGS, ConfigDrift, detect_drift};
pub use error::Error;

/// result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

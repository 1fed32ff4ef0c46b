//! http handlers for the master's node-facing endpoints.

mod node_ws;

pub use node_ws::node_ws;

/// liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

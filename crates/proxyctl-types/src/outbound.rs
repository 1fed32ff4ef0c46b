//! outbound egress route definitions.

use serde::{Deserialize, Serialize};

use crate::NodeId;

/// unique identifier for an outbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutboundId(pub i64);

impl OutboundId {
    /// convert to i64 for database storage.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for OutboundId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for OutboundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// an egress route definition owned by exactly one node.
///
/// the engine's built-in outbounds ("direct", "block") are implicit and
/// never stored. all JSON-valued fields are opaque text payloads.
///
/// invariant: `(node_id, tag)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Outbound {
    /// unique identifier.
    pub id: OutboundId,

    /// owning node.
    pub node_id: NodeId,

    /// tag, unique per node; referenced by routing rules.
    pub tag: String,

    /// protocol name (e.g. "freedom", "blackhole", "vmess").
    pub protocol: String,

    /// protocol-specific settings, opaque JSON text.
    pub settings: String,

    /// stream/transport settings, opaque JSON text.
    pub stream_settings: String,

    /// multiplexing settings, opaque JSON text.
    pub mux: String,

    /// proxy-chaining settings, opaque JSON text.
    pub proxy_settings: String,

    /// explicit source address; empty means engine default.
    pub send_through: String,

    /// disabled outbounds are excluded from the compiled document.
    pub enable: bool,
}

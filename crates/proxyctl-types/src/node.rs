//! node type representing a remote proxy host managed by the master.
//!
//! nodes connect to the master over a websocket channel, authenticate
//! with a pre-shared secret, and receive their compiled configuration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// unique identifier for a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub i64);

impl NodeId {
    /// convert to i64 for database storage.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for NodeId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// connectivity status of a node as observed by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    /// the node has never connected since it was created.
    #[default]
    Unknown,
    /// the node currently holds an open channel to the master.
    Connected,
    /// the node connected at least once and its channel is now closed.
    Disconnected,
}

impl NodeStatus {
    /// string form used for database storage.
    pub fn as_str(self) -> &'static str {
        match self {
            NodeStatus::Unknown => "unknown",
            NodeStatus::Connected => "connected",
            NodeStatus::Disconnected => "disconnected",
        }
    }

    /// parse the database string form; anything unrecognized is `Unknown`.
    pub fn parse(s: &str) -> Self {
        match s {
            "connected" => NodeStatus::Connected,
            "disconnected" => NodeStatus::Disconnected,
            _ => NodeStatus::Unknown,
        }
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// a remote proxy host ("slave") configured by this master.
///
/// the node is the root of an ownership tree: inbounds, outbounds and
/// routing rules each belong to exactly one node and are compiled
/// together into that node's configuration document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// unique identifier.
    pub id: NodeId,

    /// human-readable name, unique across the fleet. doubles as the
    /// identity presented during the channel handshake.
    pub name: String,

    /// network address of the node (host or host:port), informational.
    pub address: String,

    /// pre-shared secret the node must present when connecting.
    pub secret: String,

    /// last known connectivity status.
    pub status: NodeStatus,

    /// when the master last heard from this node.
    pub last_seen: Option<DateTime<Utc>>,

    /// when the node was created.
    pub created_at: DateTime<Utc>,

    /// when the node was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Node {
    /// create a new node with the given name, address and secret.
    pub fn new(name: String, address: String, secret: String) -> Self {
        let now = Utc::now();
        Self {
            id: NodeId(0),
            name,
            address,
            secret,
            status: NodeStatus::Unknown,
            last_seen: None,
            created_at: now,
            updated_at: now,
        }
    }
}

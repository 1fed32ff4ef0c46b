//! registry of connected nodes and their delivery channels.
//!
//! the registry is the only structure mutated by multiple concurrent
//! actors (connection accept/close, push lookups); everything lives
//! behind one rwlock-guarded map.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::{RwLock, mpsc, oneshot};

use proxyctl_types::NodeId;

/// command sent into a node's connection task.
#[derive(Debug)]
pub enum NodeCommand {
    /// deliver a serialized configuration document and report the
    /// node's acknowledgment through `reply`.
    Push {
        /// the compiled document, already serialized.
        document: String,
        /// resolved with the push outcome; dropped if the channel
        /// closes before any acknowledgment arrives.
        reply: oneshot::Sender<AckOutcome>,
    },
}

/// terminal outcome of a single push as seen by the connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckOutcome {
    /// the node acknowledged a successful apply.
    Applied,
    /// the node acknowledged with an apply failure.
    Rejected(String),
    /// a newer push replaced this one before it was acknowledged; the
    /// node applies the newer full document (last-applied-wins).
    Superseded,
}

/// a registered node's delivery handle.
#[derive(Debug, Clone)]
struct NodeHandle {
    sender: mpsc::Sender<NodeCommand>,
    /// distinguishes this registration from a replacement, so a stale
    /// connection can't unregister its successor.
    token: u64,
    connected_at: DateTime<Utc>,
}

/// process-wide map from node id to active channel.
///
/// registration happens on connect, removal on disconnect, lookup on
/// push. registering a node that already holds a channel replaces the
/// old handle; the old connection task sees its command stream end.
#[derive(Clone, Default)]
pub struct NodeRegistry {
    inner: Arc<RwLock<HashMap<NodeId, NodeHandle>>>,
    next_token: Arc<AtomicU64>,
}

impl NodeRegistry {
    /// create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// register a node's connection, returning the command stream for
    /// its connection task and the registration token to pass back to
    /// [`unregister`](Self::unregister).
    pub async fn register(
        &self,
        node_id: NodeId,
        capacity: usize,
    ) -> (mpsc::Receiver<NodeCommand>, u64) {
        let (sender, receiver) = mpsc::channel(capacity);
        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        let handle = NodeHandle {
            sender,
            token,
            connected_at: Utc::now(),
        };
        let mut inner = self.inner.write().await;
        inner.insert(node_id, handle);
        (receiver, token)
    }

    /// remove a node's channel if it still belongs to this registration.
    ///
    /// returns `true` if the entry was removed. a connection replaced by
    /// a newer one finds its token stale and leaves the map alone.
    pub async fn unregister(&self, node_id: NodeId, token: u64) -> bool {
        let mut inner = self.inner.write().await;
        match inner.get(&node_id) {
            Some(handle) if handle.token == token => {
                inner.remove(&node_id);
                true
            }
            _ => false,
        }
    }

    /// look up the active channel for a node.
    pub async fn lookup(&self, node_id: NodeId) -> Option<mpsc::Sender<NodeCommand>> {
        let inner = self.inner.read().await;
        inner.get(&node_id).map(|h| h.sender.clone())
    }

    /// whether a node currently holds an open channel.
    pub async fn is_connected(&self, node_id: NodeId) -> bool {
        let inner = self.inner.read().await;
        inner.contains_key(&node_id)
    }

    /// when the node's current channel was established.
    pub async fn connected_since(&self, node_id: NodeId) -> Option<DateTime<Utc>> {
        let inner = self.inner.read().await;
        inner.get(&node_id).map(|h| h.connected_at)
    }

    /// number of currently connected nodes.
    pub async fn connected_count(&self) -> usize {
        let inner = self.inner.read().await;
        inner.len()
    }

    /// ids of all currently connected nodes.
    pub async fn connected_nodes(&self) -> Vec<NodeId> {
        let inner = self.inner.read().await;
        inner.keys().copied().collect()
    }
}

//! the push transport: delivers compiled configuration to nodes.

use std::time::Duration;

use thiserror::Error;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::debug;

use proxyctl_compile::CompiledConfig;
use proxyctl_db::{Database, ProxyctlDb};
use proxyctl_types::NodeId;

use crate::registry::{AckOutcome, NodeCommand, NodeRegistry};

/// errors surfaced by a single push attempt.
#[derive(Debug, Error)]
pub enum PushError {
    /// the node has no active channel; no retry is attempted.
    #[error("node {0} has no active channel")]
    NodeUnreachable(NodeId),

    /// the node acknowledged an apply failure.
    #[error("node rejected configuration: {0}")]
    ApplyRejected(String),

    /// no acknowledgment arrived within the configured bound. the node
    /// is presumed unresponsive, not gone; its registry entry stays.
    #[error("timed out waiting for node acknowledgment")]
    AckTimeout,

    /// the channel closed while the push awaited acknowledgment.
    #[error("node channel closed while awaiting acknowledgment")]
    ChannelClosed,

    /// the node's stored records could not be compiled.
    #[error(transparent)]
    Compile(#[from] proxyctl_compile::Error),

    /// the store could not be read.
    #[error(transparent)]
    Db(#[from] proxyctl_db::Error),
}

/// compile a node's current records into its configuration document.
///
/// the node identifier is an explicit parameter; nothing at module
/// scope assumes a compile target.
pub async fn compile_for_node(db: &ProxyctlDb, node_id: NodeId) -> Result<CompiledConfig, PushError> {
    let inbounds = db.list_inbounds_for_node(node_id).await?;
    let outbounds = db.list_outbounds_for_node(node_id).await?;
    let rules = db.list_rules_for_node(node_id).await?;
    Ok(proxyctl_compile::compile(&inbounds, &outbounds, &rules)?)
}

/// compare a node's compiled desired state against an actually-running
/// document obtained out of band (e.g. read from the node's on-disk
/// applied config).
///
/// purely diagnostic; remediation is [`ConfigPusher::push_config`].
pub async fn detect_node_drift(
    db: &ProxyctlDb,
    node_id: NodeId,
    actual: &serde_json::Value,
    verbose: bool,
) -> Result<proxyctl_compile::ConfigDrift, PushError> {
    let expected = compile_for_node(db, node_id).await?;
    Ok(proxyctl_compile::detect_drift(
        &expected.to_value(),
        actual,
        verbose,
    ))
}

/// pushes compiled configuration to nodes and awaits their apply
/// acknowledgment.
#[derive(Clone)]
pub struct ConfigPusher {
    db: ProxyctlDb,
    registry: NodeRegistry,
    ack_timeout: Duration,
}

impl ConfigPusher {
    /// create a pusher over the given store and registry.
    pub fn new(db: ProxyctlDb, registry: NodeRegistry, ack_timeout: Duration) -> Self {
        Self {
            db,
            registry,
            ack_timeout,
        }
    }

    /// compile and deliver the full desired state for `node_id`.
    ///
    /// success requires the node's explicit positive acknowledgment; a
    /// send that succeeds at the transport layer but fails node-side
    /// apply is [`PushError::ApplyRejected`]. a push superseded by a
    /// newer one reports success: per-channel ordering guarantees the
    /// node applied this document before replacing it with the newer
    /// full document (last-applied-wins).
    pub async fn push_config(&self, node_id: NodeId) -> Result<(), PushError> {
        let document = compile_for_node(&self.db, node_id).await?;

        let Some(sender) = self.registry.lookup(node_id).await else {
            return Err(PushError::NodeUnreachable(node_id));
        };

        let (reply, ack) = oneshot::channel();
        sender
            .send(NodeCommand::Push {
                document: document.to_json(),
                reply,
            })
            .await
            .map_err(|_| PushError::NodeUnreachable(node_id))?;

        match timeout(self.ack_timeout, ack).await {
            Err(_) => Err(PushError::AckTimeout),
            // the connection task dropped the reply without resolving it:
            // the channel closed under the push
            Ok(Err(_)) => Err(PushError::ChannelClosed),
            Ok(Ok(AckOutcome::Applied)) => Ok(()),
            Ok(Ok(AckOutcome::Superseded)) => {
                debug!(%node_id, "push superseded by a newer document");
                Ok(())
            }
            Ok(Ok(AckOutcome::Rejected(reason))) => Err(PushError::ApplyRejected(reason)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxyctl_types::test_utils::{TestInboundBuilder, TestNodeBuilder};

    async fn setup() -> (ProxyctlDb, NodeRegistry, ConfigPusher, NodeId) {
        let db = ProxyctlDb::new_in_memory().await.unwrap();
        let node = db
            .create_node(&TestNodeBuilder::new(0).build())
            .await
            .unwrap();
        db.create_inbound(&TestInboundBuilder::new(0, node.id.0).with_tag("in1").build())
            .await
            .unwrap();

        let registry = NodeRegistry::new();
        let pusher = ConfigPusher::new(db.clone(), registry.clone(), Duration::from_millis(500));
        (db, registry, pusher, node.id)
    }

    #[tokio::test]
    async fn unregistered_node_is_unreachable_without_blocking() {
        let (_db, _registry, pusher, node_id) = setup().await;

        let started = std::time::Instant::now();
        let err = pusher.push_config(node_id).await.unwrap_err();
        assert!(matches!(err, PushError::NodeUnreachable(id) if id == node_id));
        // failed immediately, not after a timeout
        assert!(started.elapsed() < Duration::from_millis(100));
    }

    #[tokio::test]
    async fn positive_ack_is_success() {
        let (_db, registry, pusher, node_id) = setup().await;
        let (mut rx, _token) = registry.register(node_id, 4).await;

        let ack_task = tokio::spawn(async move {
            match rx.recv().await.unwrap() {
                NodeCommand::Push { document, reply } => {
                    // the document is the node's full desired state
                    assert!(document.contains("\"in1\""));
                    let _ = reply.send(AckOutcome::Applied);
                }
            }
        });

        pusher.push_config(node_id).await.unwrap();
        ack_task.await.unwrap();
    }

    #[tokio::test]
    async fn negative_ack_is_apply_rejected() {
        let (_db, registry, pusher, node_id) = setup().await;
        let (mut rx, _token) = registry.register(node_id, 4).await;

        tokio::spawn(async move {
            match rx.recv().await.unwrap() {
                NodeCommand::Push { reply, .. } => {
                    let _ = reply.send(AckOutcome::Rejected("port in use".to_string()));
                }
            }
        });

        let err = pusher.push_config(node_id).await.unwrap_err();
        match err {
            PushError::ApplyRejected(reason) => assert_eq!(reason, "port in use"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn dropped_reply_fails_promptly_not_after_timeout() {
        let (db, registry, _pusher, node_id) = setup().await;
        // pusher with a long timeout so a timeout-based failure would be obvious
        let pusher = ConfigPusher::new(db, registry.clone(), Duration::from_secs(30));
        let (mut rx, _token) = registry.register(node_id, 4).await;

        tokio::spawn(async move {
            match rx.recv().await.unwrap() {
                // simulate disconnect while the push awaits its ack
                NodeCommand::Push { reply, .. } => drop(reply),
            }
        });

        let started = std::time::Instant::now();
        let err = pusher.push_config(node_id).await.unwrap_err();
        assert!(matches!(err, PushError::ChannelClosed));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn missing_ack_times_out() {
        let (db, registry, _pusher, node_id) = setup().await;
        let pusher = ConfigPusher::new(db, registry.clone(), Duration::from_millis(100));
        let (mut rx, _token) = registry.register(node_id, 4).await;

        // hold the reply open without answering
        let hold = tokio::spawn(async move {
            let command = rx.recv().await.unwrap();
            tokio::time::sleep(Duration::from_secs(5)).await;
            drop(command);
        });

        let err = pusher.push_config(node_id).await.unwrap_err();
        assert!(matches!(err, PushError::AckTimeout));

        // the ack timeout does not unregister the node
        assert!(registry.is_connected(node_id).await);
        hold.abort();
    }

    #[tokio::test]
    async fn superseded_push_reports_success() {
        let (_db, registry, pusher, node_id) = setup().await;
        let (mut rx, _token) = registry.register(node_id, 4).await;

        // connection task that supersedes the outstanding push when a
        // newer one arrives, then acks the newer one - mirroring the
        // pump's behavior
        tokio::spawn(async move {
            let mut pending: Option<oneshot::Sender<AckOutcome>> = None;
            while let Some(NodeCommand::Push { reply, .. }) = rx.recv().await {
                match pending.take() {
                    None => pending = Some(reply),
                    Some(old) => {
                        let _ = old.send(AckOutcome::Superseded);
                        let _ = reply.send(AckOutcome::Applied);
                        break;
                    }
                }
            }
        });

        let first = pusher.push_config(node_id);
        let second = pusher.push_config(node_id);
        let (a, b) = tokio::join!(first, second);
        assert!(a.is_ok(), "superseded push should report success: {a:?}");
        assert!(b.is_ok(), "final push should report success: {b:?}");
    }

    #[tokio::test]
    async fn drift_check_compares_against_the_compiled_desired_state() {
        let (db, _registry, _pusher, node_id) = setup().await;

        // the node runs an empty config, so the stored inbound is missing
        let actual = serde_json::json!({"inbounds": [], "outbounds": []});
        let drift = detect_node_drift(&db, node_id, &actual, false)
            .await
            .unwrap();
        assert_eq!(drift.missing_inbounds, ["in1"]);
        assert!(drift.needs_repush());
    }
}

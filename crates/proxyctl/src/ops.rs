//! state mutation operations and the pushes they trigger.
//!
//! the administrative surface itself lives elsewhere; these are the
//! operations it calls. every mutation re-pushes the affected node(s)
//! so the fleet converges on the new desired state, and reassigning a
//! record to a different node deliberately pushes the *old* node too -
//! its compiled config just lost an entry.

use proxyctl_db::{Database, Error as DbError, ProxyctlDb};
use proxyctl_types::{Inbound, NodeId, Outbound, OutboundId, RoutingRule, RuleId};
use tracing::{debug, warn};

use crate::push::{ConfigPusher, PushError};

/// per-node push results of a state mutation.
///
/// the mutation itself either fully succeeded or errored; pushes are
/// best-effort and reported here instead of failing the operation.
#[derive(Debug, Default)]
pub struct SyncReport {
    /// nodes that acknowledged the re-push.
    pub pushed: Vec<NodeId>,
    /// nodes whose re-push failed.
    pub failures: Vec<(NodeId, PushError)>,
}

impl SyncReport {
    async fn push(&mut self, pusher: &ConfigPusher, node_id: NodeId) {
        match pusher.push_config(node_id).await {
            Ok(()) => self.pushed.push(node_id),
            Err(e) => {
                warn!(node = %node_id, error = %e, "re-push after mutation failed");
                self.failures.push((node_id, e));
            }
        }
    }
}

/// update an inbound and re-push its owning node.
pub async fn update_inbound(
    db: &ProxyctlDb,
    pusher: &ConfigPusher,
    inbound: &Inbound,
) -> Result<SyncReport, DbError> {
    let Some(old) = db.get_inbound(inbound.id).await? else {
        return Err(DbError::NotFound(format!("inbound {}", inbound.id)));
    };

    let mut report = SyncReport::default();
    if old.node_id != inbound.node_id {
        // reassignment: recreate under the new node so (node, tag)
        // uniqueness is re-checked, then converge both nodes
        db.delete_inbound(inbound.id).await?;
        let mut moved = inbound.clone();
        moved.id = proxyctl_types::InboundId(0);
        db.create_inbound(&moved).await?;
        debug!(inbound = %inbound.id, from = %old.node_id, to = %inbound.node_id, "inbound reassigned");
        report.push(pusher, old.node_id).await;
        report.push(pusher, inbound.node_id).await;
    } else {
        db.update_inbound(inbound).await?;
        report.push(pusher, inbound.node_id).await;
    }
    Ok(report)
}

/// update an outbound and re-push the affected node(s).
///
/// when the owning node changes, the record is deleted and recreated
/// under the new node, and **both** nodes are pushed: the old node's
/// compiled config no longer contains the outbound and must be
/// invalidated along with the new one.
pub async fn update_outbound(
    db: &ProxyctlDb,
    pusher: &ConfigPusher,
    outbound: &Outbound,
) -> Result<SyncReport, DbError> {
    let Some(old) = db.get_outbound(outbound.id).await? else {
        return Err(DbError::NotFound(format!("outbound {}", outbound.id)));
    };

    let mut report = SyncReport::default();
    if old.node_id != outbound.node_id {
        db.delete_outbound(outbound.id).await?;
        let mut moved = outbound.clone();
        moved.id = OutboundId(0);
        db.create_outbound(&moved).await?;
        debug!(outbound = %outbound.id, from = %old.node_id, to = %outbound.node_id, "outbound reassigned");
        report.push(pusher, old.node_id).await;
        report.push(pusher, outbound.node_id).await;
    } else {
        db.update_outbound(outbound).await?;
        report.push(pusher, outbound.node_id).await;
    }
    Ok(report)
}

/// update a routing rule and re-push the affected node(s).
///
/// owning-node changes behave exactly like [`update_outbound`]: delete,
/// recreate, push both nodes.
pub async fn update_routing_rule(
    db: &ProxyctlDb,
    pusher: &ConfigPusher,
    rule: &RoutingRule,
) -> Result<SyncReport, DbError> {
    let Some(old) = db.get_routing_rule(rule.id).await? else {
        return Err(DbError::NotFound(format!("routing rule {}", rule.id)));
    };

    let mut report = SyncReport::default();
    if old.node_id != rule.node_id {
        db.delete_routing_rule(rule.id).await?;
        let mut moved = rule.clone();
        moved.id = RuleId(0);
        db.create_routing_rule(&moved).await?;
        debug!(rule = %rule.id, from = %old.node_id, to = %rule.node_id, "routing rule reassigned");
        report.push(pusher, old.node_id).await;
        report.push(pusher, rule.node_id).await;
    } else {
        db.update_routing_rule(rule).await?;
        report.push(pusher, rule.node_id).await;
    }
    Ok(report)
}

//! ordered routing rules matching traffic to outbounds.

use serde::{Deserialize, Serialize};

use crate::NodeId;

/// unique identifier for a routing rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleId(pub i64);

impl RuleId {
    /// convert to i64 for database storage.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for RuleId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for RuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a match-and-dispatch rule owned by exactly one node.
///
/// the list-valued match fields (`domain`, `ip`, `source`, `user`,
/// `inbound_tag`) are stored as raw JSON array text and forwarded
/// verbatim, preserving the administrator's ordering. `sort` orders the
/// rules within a node's compiled document and is never emitted itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingRule {
    /// unique identifier.
    pub id: RuleId,

    /// owning node.
    pub node_id: NodeId,

    /// rule type, usually "field".
    pub rule_type: String,

    /// domain match list, raw JSON array text.
    pub domain: String,

    /// ip/cidr match list, raw JSON array text.
    pub ip: String,

    /// port or port-range match expression.
    pub port: String,

    /// network match ("tcp", "udp", "tcp,udp").
    pub network: String,

    /// source address match list, raw JSON array text.
    pub source: String,

    /// user (client email) match list, raw JSON array text.
    pub user: String,

    /// inbound tag match list, raw JSON array text.
    pub inbound_tag: String,

    /// outbound tag the rule dispatches to.
    pub outbound_tag: String,

    /// balancer tag the rule dispatches to (alternative to outbound_tag).
    pub balancer_tag: String,

    /// explicit sort key; rules are compiled in ascending order.
    pub sort: i32,
}

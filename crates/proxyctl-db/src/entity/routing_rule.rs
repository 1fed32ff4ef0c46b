//! routing rule entity for database storage.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use proxyctl_types::{NodeId, RoutingRule, RuleId};

/// routing rule database model.
///
/// `rule_type` and `user` dodge the sql keywords `type` and `user` at
/// the column level; the list-valued match columns hold raw JSON array
/// text, forwarded verbatim.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "routing_rules")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub node_id: i64,
    pub rule_type: String,
    #[sea_orm(column_type = "Text")]
    pub domain: String,
    #[sea_orm(column_type = "Text")]
    pub ip: String,
    pub port: String,
    pub network: String,
    #[sea_orm(column_type = "Text")]
    pub source: String,
    #[sea_orm(column_type = "Text")]
    pub user_match: String,
    #[sea_orm(column_type = "Text")]
    pub inbound_tag: String,
    pub outbound_tag: String,
    pub balancer_tag: String,
    pub sort: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::node::Entity",
        from = "Column::NodeId",
        to = "super::node::Column::Id"
    )]
    Node,
}

impl Related<super::node::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Node.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for RoutingRule {
    fn from(model: Model) -> Self {
        RoutingRule {
            id: RuleId(model.id),
            node_id: NodeId(model.node_id),
            rule_type: model.rule_type,
            domain: model.domain,
            ip: model.ip,
            port: model.port,
            network: model.network,
            source: model.source,
            user: model.user_match,
            inbound_tag: model.inbound_tag,
            outbound_tag: model.outbound_tag,
            balancer_tag: model.balancer_tag,
            sort: model.sort,
        }
    }
}

impl From<&RoutingRule> for ActiveModel {
    fn from(rule: &RoutingRule) -> Self {
        ActiveModel {
            id: if rule.id.0 == 0 {
                NotSet
            } else {
                Set(rule.id.as_i64())
            },
            node_id: Set(rule.node_id.as_i64()),
            rule_type: Set(rule.rule_type.clone()),
            domain: Set(rule.domain.clone()),
            ip: Set(rule.ip.clone()),
            port: Set(rule.port.clone()),
            network: Set(rule.network.clone()),
            source: Set(rule.source.clone()),
            user_match: Set(rule.user.clone()),
            inbound_tag: Set(rule.inbound_tag.clone()),
            outbound_tag: Set(rule.outbound_tag.clone()),
            balancer_tag: Set(rule.balancer_tag.clone()),
            sort: Set(rule.sort),
        }
    }
}

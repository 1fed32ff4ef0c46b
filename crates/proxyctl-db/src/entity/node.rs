//! node entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use proxyctl_types::{Node, NodeId, NodeStatus};

/// node database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "nodes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    pub address: String,
    pub secret: String,
    /// nodestatus as string
    pub status: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::inbound::Entity")]
    Inbounds,
    #[sea_orm(has_many = "super::outbound::Entity")]
    Outbounds,
    #[sea_orm(has_many = "super::routing_rule::Entity")]
    RoutingRules,
}

impl Related<super::inbound::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inbounds.def()
    }
}

impl Related<super::outbound::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Outbounds.def()
    }
}

impl Related<super::routing_rule::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RoutingRules.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Node {
    fn from(model: Model) -> Self {
        Node {
            id: NodeId(model.id),
            name: model.name,
            address: model.address,
            secret: model.secret,
            status: NodeStatus::parse(&model.status),
            last_seen: model.last_seen,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Node> for ActiveModel {
    fn from(node: &Node) -> Self {
        ActiveModel {
            id: if node.id.0 == 0 {
                NotSet
            } else {
                Set(node.id.as_i64())
            },
            name: Set(node.name.clone()),
            address: Set(node.address.clone()),
            secret: Set(node.secret.clone()),
            status: Set(node.status.as_str().to_string()),
            last_seen: Set(node.last_seen),
            created_at: Set(node.created_at),
            updated_at: Set(node.updated_at),
        }
    }
}

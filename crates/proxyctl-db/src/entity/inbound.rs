//! inbound entity for database storage.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use proxyctl_types::{Inbound, InboundId, NodeId};

/// inbound database model.
///
/// the JSON-valued columns are opaque text; they are stored and
/// returned byte-for-byte.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "inbounds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub node_id: i64,
    pub tag: String,
    pub listen: String,
    pub port: i32,
    pub protocol: String,
    #[sea_orm(column_type = "Text")]
    pub settings: String,
    #[sea_orm(column_type = "Text")]
    pub stream_settings: String,
    #[sea_orm(column_type = "Text")]
    pub sniffing: String,
    pub remark: String,
    pub enable: bool,
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

impl From<Model> for Inbound {
    fn from(model: Model) -> Self {
        Inbound {
            id: InboundId(model.id),
            node_id: NodeId(model.node_id),
            tag: model.tag,
            listen: model.listen,
            port: model.port as u16,
            protocol: model.protocol,
            settings: model.settings,
            stream_settings: model.stream_settings,
            sniffing: model.sniffing,
            remark: model.remark,
            enable: model.enable,
        }
    }
}

impl From<&Inbound> for ActiveModel {
    fn from(inbound: &Inbound) -> Self {
        ActiveModel {
            id: if inbound.id.0 == 0 {
                NotSet
            } else {
                Set(inbound.id.as_i64())
            },
            node_id: Set(inbound.node_id.as_i64()),
            tag: Set(inbound.tag.clone()),
            listen: Set(inbound.listen.clone()),
            port: Set(inbound.port as i32),
            protocol: Set(inbound.protocol.clone()),
            settings: Set(inbound.settings.clone()),
            stream_settings: Set(inbound.stream_settings.clone()),
            sniffing: Set(inbound.sniffing.clone()),
            remark: Set(inbound.remark.clone()),
            enable: Set(inbound.enable),
        }
    }
}

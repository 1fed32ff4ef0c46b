//! outbound entity for database storage.

use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use proxyctl_types::{NodeId, Outbound, OutboundId};

/// outbound database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "outbounds")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub node_id: i64,
    pub tag: String,
    pub protocol: String,
    #[sea_orm(column_type = "Text")]
    pub settings: String,
    #[sea_orm(column_type = "Text")]
    pub stream_settings: String,
    #[sea_orm(column_type = "Text")]
    pub mux: String,
    #[sea_orm(column_type = "Text")]
    pub proxy_settings: String,
    pub send_through: String,
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

impl From<Model> for Outbound {
    fn from(model: Model) -> Self {
        Outbound {
            id: OutboundId(model.id),
            node_id: NodeId(model.node_id),
            tag: model.tag,
            protocol: model.protocol,
            settings: model.settings,
            stream_settings: model.stream_settings,
            mux: model.mux,
            proxy_settings: model.proxy_settings,
            send_through: model.send_through,
            enable: model.enable,
        }
    }
}

impl From<&Outbound> for ActiveModel {
    fn from(outbound: &Outbound) -> Self {
        ActiveModel {
            id: if outbound.id.0 == 0 {
                NotSet
            } else {
                Set(outbound.id.as_i64())
            },
            node_id: Set(outbound.node_id.as_i64()),
            tag: Set(outbound.tag.clone()),
            protocol: Set(outbound.protocol.clone()),
            settings: Set(outbound.settings.clone()),
            stream_settings: Set(outbound.stream_settings.clone()),
            mux: Set(outbound.mux.clone()),
            proxy_settings: Set(outbound.proxy_settings.clone()),
            send_through: Set(outbound.send_through.clone()),
            enable: Set(outbound.enable),
        }
    }
}

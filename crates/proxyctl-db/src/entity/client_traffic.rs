//! per-client traffic counter entity.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use proxyctl_types::{ClientTraffic, InboundId};

/// per-client traffic counters, keyed by (inbound, email).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "client_traffic")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub inbound_id: i64,
    pub email: String,
    pub up: i64,
    pub down: i64,
    pub enable: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::inbound::Entity",
        from = "Column::InboundId",
        to = "super::inbound::Column::Id"
    )]
    Inbound,
}

impl Related<super::inbound::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inbound.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for ClientTraffic {
    fn from(model: Model) -> Self {
        ClientTraffic {
            inbound_id: InboundId(model.inbound_id),
            email: model.email,
            up: model.up,
            down: model.down,
            enable: model.enable,
        }
    }
}

impl From<&ClientTraffic> for ActiveModel {
    fn from(traffic: &ClientTraffic) -> Self {
        ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            inbound_id: Set(traffic.inbound_id.as_i64()),
            email: Set(traffic.email.clone()),
            up: Set(traffic.up),
            down: Set(traffic.down),
            enable: Set(traffic.enable),
        }
    }
}

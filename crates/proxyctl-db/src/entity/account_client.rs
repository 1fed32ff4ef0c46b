//! account-client association entity.

use sea_orm::entity::prelude::*;
use sea_orm::Set;

use proxyctl_types::{AccountClient, AccountId, InboundId};

/// association between an account and a client embedded in an inbound.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "account_clients")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub account_id: i64,
    pub inbound_id: i64,
    pub email: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::account::Entity",
        from = "Column::AccountId",
        to = "super::account::Column::Id"
    )]
    Account,
    #[sea_orm(
        belongs_to = "super::inbound::Entity",
        from = "Column::InboundId",
        to = "super::inbound::Column::Id"
    )]
    Inbound,
}

impl Related<super::account::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Account.def()
    }
}

impl Related<super::inbound::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Inbound.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for AccountClient {
    fn from(model: Model) -> Self {
        AccountClient {
            account_id: AccountId(model.account_id),
            inbound_id: InboundId(model.inbound_id),
            email: model.email,
        }
    }
}

impl From<&AccountClient> for ActiveModel {
    fn from(client: &AccountClient) -> Self {
        ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            account_id: Set(client.account_id.as_i64()),
            inbound_id: Set(client.inbound_id.as_i64()),
            email: Set(client.email.clone()),
        }
    }
}

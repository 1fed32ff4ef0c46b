//! account entity for database storage.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue::NotSet, Set};

use proxyctl_types::{Account, AccountId};

/// account database model.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "accounts")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub name: String,
    /// traffic quota in bytes; 0 means unlimited
    pub quota: i64,
    pub expiry: Option<DateTime<Utc>>,
    pub enable: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::account_client::Entity")]
    AccountClients,
}

impl Related<super::account_client::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::AccountClients.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for Account {
    fn from(model: Model) -> Self {
        Account {
            id: AccountId(model.id),
            name: model.name,
            quota: model.quota,
            expiry: model.expiry,
            enable: model.enable,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<&Account> for ActiveModel {
    fn from(account: &Account) -> Self {
        ActiveModel {
            id: if account.id.0 == 0 {
                NotSet
            } else {
                Set(account.id.as_i64())
            },
            name: Set(account.name.clone()),
            quota: Set(account.quota),
            expiry: Set(account.expiry),
            enable: Set(account.enable),
            created_at: Set(account.created_at),
            updated_at: Set(account.updated_at),
        }
    }
}

//! create account-client association table migration

use sea_orm_migration::prelude::*;

use super::m20260301_000002_create_inbounds::Inbounds;
use super::m20260301_000005_create_accounts::Accounts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AccountClients::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AccountClients::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(AccountClients::AccountId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AccountClients::InboundId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AccountClients::Email).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_clients_account")
                            .from(AccountClients::Table, AccountClients::AccountId)
                            .to(Accounts::Table, Accounts::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_account_clients_inbound")
                            .from(AccountClients::Table, AccountClients::InboundId)
                            .to(Inbounds::Table, Inbounds::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_account_clients_unique")
                    .table(AccountClients::Table)
                    .col(AccountClients::AccountId)
                    .col(AccountClients::InboundId)
                    .col(AccountClients::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AccountClients::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum AccountClients {
    Table,
    Id,
    AccountId,
    InboundId,
    Email,
}

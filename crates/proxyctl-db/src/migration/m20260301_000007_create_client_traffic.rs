//! create client traffic counters table migration

use sea_orm_migration::prelude::*;

use super::m20260301_000002_create_inbounds::Inbounds;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ClientTraffic::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ClientTraffic::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ClientTraffic::InboundId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ClientTraffic::Email).string().not_null())
                    .col(
                        ColumnDef::new(ClientTraffic::Up)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ClientTraffic::Down)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ClientTraffic::Enable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_client_traffic_inbound")
                            .from(ClientTraffic::Table, ClientTraffic::InboundId)
                            .to(Inbounds::Table, Inbounds::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_client_traffic_inbound_email_unique")
                    .table(ClientTraffic::Table)
                    .col(ClientTraffic::InboundId)
                    .col(ClientTraffic::Email)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ClientTraffic::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ClientTraffic {
    Table,
    Id,
    InboundId,
    Email,
    Up,
    Down,
    Enable,
}

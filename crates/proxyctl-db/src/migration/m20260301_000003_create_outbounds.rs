//! create outbounds table migration

use sea_orm_migration::prelude::*;

use super::m20260301_000001_create_nodes::Nodes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Outbounds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Outbounds::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Outbounds::NodeId).big_integer().not_null())
                    .col(ColumnDef::new(Outbounds::Tag).string().not_null())
                    .col(ColumnDef::new(Outbounds::Protocol).string().not_null())
                    .col(
                        ColumnDef::new(Outbounds::Settings)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Outbounds::StreamSettings)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Outbounds::Mux)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Outbounds::ProxySettings)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Outbounds::SendThrough)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Outbounds::Enable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_outbounds_node")
                            .from(Outbounds::Table, Outbounds::NodeId)
                            .to(Nodes::Table, Nodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_outbounds_node_tag_unique")
                    .table(Outbounds::Table)
                    .col(Outbounds::NodeId)
                    .col(Outbounds::Tag)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Outbounds::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Outbounds {
    Table,
    Id,
    NodeId,
    Tag,
    Protocol,
    Settings,
    StreamSettings,
    Mux,
    ProxySettings,
    SendThrough,
    Enable,
}

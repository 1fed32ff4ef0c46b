//! create inbounds table migration

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
                    .table(Inbounds::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Inbounds::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Inbounds::NodeId).big_integer().not_null())
                    .col(ColumnDef::new(Inbounds::Tag).string().not_null())
                    .col(
                        ColumnDef::new(Inbounds::Listen)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Inbounds::Port).integer().not_null())
                    .col(ColumnDef::new(Inbounds::Protocol).string().not_null())
                    .col(
                        ColumnDef::new(Inbounds::Settings)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Inbounds::StreamSettings)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Inbounds::Sniffing)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Inbounds::Remark)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(
                        ColumnDef::new(Inbounds::Enable)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_inbounds_node")
                            .from(Inbounds::Table, Inbounds::NodeId)
                            .to(Nodes::Table, Nodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_inbounds_node_tag_unique")
                    .table(Inbounds::Table)
                    .col(Inbounds::NodeId)
                    .col(Inbounds::Tag)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Inbounds::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Inbounds {
    Table,
    Id,
    NodeId,
    Tag,
    Listen,
    Port,
    Protocol,
    Settings,
    StreamSettings,
    Sniffing,
    Remark,
    Enable,
}

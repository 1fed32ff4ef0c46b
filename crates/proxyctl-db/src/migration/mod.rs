//! database migrations for proxyctl.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_nodes;
mod m20260301_000002_create_inbounds;
mod m20260301_000003_create_outbounds;
mod m20260301_000004_create_routing_rules;
mod m20260301_000005_create_accounts;
mod m20260301_000006_create_account_clients;
mod m20260301_000007_create_client_traffic;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_nodes::Migration),
            Box::new(m20260301_000002_create_inbounds::Migration),
            Box::new(m20260301_000003_create_outbounds::Migration),
            Box::new(m20260301_000004_create_routing_rules::Migration),
            Box::new(m20260301_000005_create_accounts::Migration),
            Box::new(m20260301_000006_create_account_clients::Migration),
            Box::new(m20260301_000007_create_client_traffic::Migration),
        ]
    }
}

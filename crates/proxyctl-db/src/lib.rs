//! database layer for proxyctl.
//!
//! this crate provides persistent storage for:
//! - Nodes
//! - Inbounds / Outbounds / RoutingRules (the per-node config records)
//! - Accounts and their client associations
//! - Per-client traffic counters
//!
//! the store is treated as an external collaborator with its own
//! transaction isolation; callers compose these operations without any
//! cross-call locking of their own.

#![warn(missing_docs)]

mod entity;
mod error;
mod migration;

pub use error::Error;

use std::future::Future;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Database as SeaOrmDatabase, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use sea_orm_migration::MigratorTrait;

use proxyctl_types::{
    Account, AccountClient, AccountId, ClientTraffic, DatabaseConfig, Inbound, InboundId, Node,
    NodeId, NodeStatus, Outbound, OutboundId, RoutingRule, RuleId,
};

/// result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// database trait for proxyctl storage operations.
///
/// this trait abstracts the relational store behind async operations so
/// the transport, policy loop and tests can share one surface.
pub trait Database: Send + Sync {
    // ─── Health Check ─────────────────────────────────────────────────────────

    /// ping the database to verify connectivity.
    fn ping(&self) -> impl Future<Output = Result<()>> + Send;

    // ─── Node Operations ─────────────────────────────────────────────────────

    /// create a new node. returns the created node with its assigned id.
    fn create_node(&self, node: &Node) -> impl Future<Output = Result<Node>> + Send;

    /// get a node by id. returns `None` if not found.
    fn get_node(&self, id: NodeId) -> impl Future<Output = Result<Option<Node>>> + Send;

    /// get a node by its unique name (the handshake identity).
    fn get_node_by_name(&self, name: &str) -> impl Future<Output = Result<Option<Node>>> + Send;

    /// list all nodes.
    fn list_nodes(&self) -> impl Future<Output = Result<Vec<Node>>> + Send;

    /// update an existing node. also bumps the `updated_at` timestamp.
    fn update_node(&self, node: &Node) -> impl Future<Output = Result<Node>> + Send;

    /// record a connectivity transition observed by the registry.
    fn set_node_status(
        &self,
        id: NodeId,
        status: NodeStatus,
        last_seen: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<()>> + Send;

    /// delete a node; owned inbounds/outbounds/rules cascade.
    fn delete_node(&self, id: NodeId) -> impl Future<Output = Result<()>> + Send;

    // ─── Inbound Operations ──────────────────────────────────────────────────

    /// create a new inbound. returns it with its assigned id.
    fn create_inbound(&self, inbound: &Inbound) -> impl Future<Output = Result<Inbound>> + Send;

    /// get an inbound by id.
    fn get_inbound(&self, id: InboundId) -> impl Future<Output = Result<Option<Inbound>>> + Send;

    /// list all inbounds owned by a node.
    fn list_inbounds_for_node(
        &self,
        node_id: NodeId,
    ) -> impl Future<Output = Result<Vec<Inbound>>> + Send;

    /// update an existing inbound.
    fn update_inbound(&self, inbound: &Inbound) -> impl Future<Output = Result<Inbound>> + Send;

    /// delete an inbound.
    fn delete_inbound(&self, id: InboundId) -> impl Future<Output = Result<()>> + Send;

    // ─── Outbound Operations ─────────────────────────────────────────────────

    /// create a new outbound. returns it with its assigned id.
    fn create_outbound(&self, outbound: &Outbound)
    -> impl Future<Output = Result<Outbound>> + Send;

    /// get an outbound by id.
    fn get_outbound(&self, id: OutboundId)
    -> impl Future<Output = Result<Option<Outbound>>> + Send;

    /// list all outbounds owned by a node.
    fn list_outbounds_for_node(
        &self,
        node_id: NodeId,
    ) -> impl Future<Output = Result<Vec<Outbound>>> + Send;

    /// list outbounds across all nodes (administrative listing).
    fn list_all_outbounds(&self) -> impl Future<Output = Result<Vec<Outbound>>> + Send;

    /// update an existing outbound.
    fn update_outbound(&self, outbound: &Outbound)
    -> impl Future<Output = Result<Outbound>> + Send;

    /// delete an outbound.
    fn delete_outbound(&self, id: OutboundId) -> impl Future<Output = Result<()>> + Send;

    // ─── Routing Rule Operations ─────────────────────────────────────────────

    /// create a new routing rule. returns it with its assigned id.
    fn create_routing_rule(
        &self,
        rule: &RoutingRule,
    ) -> impl Future<Output = Result<RoutingRule>> + Send;

    /// get a routing rule by id.
    fn get_routing_rule(
        &self,
        id: RuleId,
    ) -> impl Future<Output = Result<Option<RoutingRule>>> + Send;

    /// list a node's routing rules in ascending sort-key order.
    fn list_rules_for_node(
        &self,
        node_id: NodeId,
    ) -> impl Future<Output = Result<Vec<RoutingRule>>> + Send;

    /// list routing rules across all nodes, in ascending sort-key order.
    fn list_all_rules(&self) -> impl Future<Output = Result<Vec<RoutingRule>>> + Send;

    /// update an existing routing rule.
    fn update_routing_rule(
        &self,
        rule: &RoutingRule,
    ) -> impl Future<Output = Result<RoutingRule>> + Send;

    /// delete a routing rule.
    fn delete_routing_rule(&self, id: RuleId) -> impl Future<Output = Result<()>> + Send;

    // ─── Account Operations ──────────────────────────────────────────────────

    /// create a new account. returns it with its assigned id.
    fn create_account(&self, account: &Account) -> impl Future<Output = Result<Account>> + Send;

    /// get an account by id.
    fn get_account(&self, id: AccountId) -> impl Future<Output = Result<Option<Account>>> + Send;

    /// list all accounts.
    fn list_accounts(&self) -> impl Future<Output = Result<Vec<Account>>> + Send;

    /// list accounts with the enable flag set (the policy loop's input).
    fn list_enabled_accounts(&self) -> impl Future<Output = Result<Vec<Account>>> + Send;

    /// update an existing account. also bumps the `updated_at` timestamp.
    fn update_account(&self, account: &Account) -> impl Future<Output = Result<Account>> + Send;

    /// delete an account; its client associations cascade.
    fn delete_account(&self, id: AccountId) -> impl Future<Output = Result<()>> + Send;

    // ─── Account Client Operations ───────────────────────────────────────────

    /// associate a client embedded in an inbound with an account.
    fn add_account_client(
        &self,
        client: &AccountClient,
    ) -> impl Future<Output = Result<()>> + Send;

    /// remove a client association from an account.
    fn remove_account_client(
        &self,
        account_id: AccountId,
        inbound_id: InboundId,
        email: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// list the client associations of an account.
    fn list_account_clients(
        &self,
        account_id: AccountId,
    ) -> impl Future<Output = Result<Vec<AccountClient>>> + Send;

    // ─── Client Traffic Operations ───────────────────────────────────────────

    /// add traffic deltas to a client's counters, creating the row on
    /// first sight.
    fn record_client_traffic(
        &self,
        inbound_id: InboundId,
        email: &str,
        up: i64,
        down: i64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// get a client's traffic counters.
    fn get_client_traffic(
        &self,
        inbound_id: InboundId,
        email: &str,
    ) -> impl Future<Output = Result<Option<ClientTraffic>>> + Send;

    /// list the traffic rows of an account's clients.
    fn list_traffic_for_account(
        &self,
        account_id: AccountId,
    ) -> impl Future<Output = Result<Vec<ClientTraffic>>> + Send;

    /// mirror a client's enable flag onto its traffic row.
    fn set_client_traffic_enabled(
        &self,
        inbound_id: InboundId,
        email: &str,
        enabled: bool,
    ) -> impl Future<Output = Result<()>> + Send;

    /// zero the traffic counters of an account's clients.
    fn reset_account_traffic(
        &self,
        account_id: AccountId,
    ) -> impl Future<Output = Result<()>> + Send;
}

/// the main database implementation using sea-orm over sqlite.
#[derive(Clone)]
pub struct ProxyctlDb {
    conn: DatabaseConnection,
}

impl ProxyctlDb {
    /// create a new database connection from config and run migrations.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let url = Self::build_connection_url(config);
        let conn: DatabaseConnection = SeaOrmDatabase::connect(&url)
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    /// build a sea-orm compatible connection url from config.
    fn build_connection_url(config: &DatabaseConfig) -> String {
        let path = if config.connection_string.starts_with("sqlite:") {
            config.connection_string.clone()
        } else {
            format!("sqlite:{}", config.connection_string)
        };
        // add ?mode=rwc to create the file if it doesn't exist
        if path.contains('?') {
            path
        } else {
            format!("{path}?mode=rwc")
        }
    }

    /// create an in-memory sqlite database for testing.
    pub async fn new_in_memory() -> Result<Self> {
        let conn: DatabaseConnection = SeaOrmDatabase::connect("sqlite::memory:")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        let db = Self { conn };
        db.migrate().await?;
        Ok(db)
    }

    /// run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        migration::Migrator::up(&self.conn, None)
            .await
            .map_err(|e| Error::Migration(e.to_string()))?;
        Ok(())
    }
}

impl Database for ProxyctlDb {
    // health check

    async fn ping(&self) -> Result<()> {
        use sea_orm::ConnectionTrait;
        self.conn
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        Ok(())
    }

    // node operations

    async fn create_node(&self, node: &Node) -> Result<Node> {
        let model: entity::node::ActiveModel = node.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn get_node(&self, id: NodeId) -> Result<Option<Node>> {
        let result = entity::node::Entity::find_by_id(id.as_i64())
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn get_node_by_name(&self, name: &str) -> Result<Option<Node>> {
        let result = entity::node::Entity::find()
            .filter(entity::node::Column::Name.eq(name))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let results = entity::node::Entity::find().all(&self.conn).await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update_node(&self, node: &Node) -> Result<Node> {
        let mut model: entity::node::ActiveModel = node.into();
        model.updated_at = Set(Utc::now());
        let result = model.update(&self.conn).await?;
        Ok(result.into())
    }

    async fn set_node_status(
        &self,
        id: NodeId,
        status: NodeStatus,
        last_seen: Option<DateTime<Utc>>,
    ) -> Result<()> {
        let mut update = entity::node::Entity::update_many()
            .col_expr(
                entity::node::Column::Status,
                sea_orm::sea_query::Expr::value(status.as_str()),
            )
            .col_expr(
                entity::node::Column::UpdatedAt,
                sea_orm::sea_query::Expr::value(Utc::now()),
            );
        if let Some(seen) = last_seen {
            update = update.col_expr(
                entity::node::Column::LastSeen,
                sea_orm::sea_query::Expr::value(seen),
            );
        }
        update
            .filter(entity::node::Column::Id.eq(id.as_i64()))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn delete_node(&self, id: NodeId) -> Result<()> {
        entity::node::Entity::delete_by_id(id.as_i64())
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // inbound operations

    async fn create_inbound(&self, inbound: &Inbound) -> Result<Inbound> {
        let model: entity::inbound::ActiveModel = inbound.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn get_inbound(&self, id: InboundId) -> Result<Option<Inbound>> {
        let result = entity::inbound::Entity::find_by_id(id.as_i64())
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_inbounds_for_node(&self, node_id: NodeId) -> Result<Vec<Inbound>> {
        let results = entity::inbound::Entity::find()
            .filter(entity::inbound::Column::NodeId.eq(node_id.as_i64()))
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update_inbound(&self, inbound: &Inbound) -> Result<Inbound> {
        let model: entity::inbound::ActiveModel = inbound.into();
        let result = model.update(&self.conn).await?;
        Ok(result.into())
    }

    async fn delete_inbound(&self, id: InboundId) -> Result<()> {
        entity::inbound::Entity::delete_by_id(id.as_i64())
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // outbound operations

    async fn create_outbound(&self, outbound: &Outbound) -> Result<Outbound> {
        let model: entity::outbound::ActiveModel = outbound.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn get_outbound(&self, id: OutboundId) -> Result<Option<Outbound>> {
        let result = entity::outbound::Entity::find_by_id(id.as_i64())
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_outbounds_for_node(&self, node_id: NodeId) -> Result<Vec<Outbound>> {
        let results = entity::outbound::Entity::find()
            .filter(entity::outbound::Column::NodeId.eq(node_id.as_i64()))
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn list_all_outbounds(&self) -> Result<Vec<Outbound>> {
        let results = entity::outbound::Entity::find().all(&self.conn).await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update_outbound(&self, outbound: &Outbound) -> Result<Outbound> {
        let model: entity::outbound::ActiveModel = outbound.into();
        let result = model.update(&self.conn).await?;
        Ok(result.into())
    }

    async fn delete_outbound(&self, id: OutboundId) -> Result<()> {
        entity::outbound::Entity::delete_by_id(id.as_i64())
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // routing rule operations

    async fn create_routing_rule(&self, rule: &RoutingRule) -> Result<RoutingRule> {
        let model: entity::routing_rule::ActiveModel = rule.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn get_routing_rule(&self, id: RuleId) -> Result<Option<RoutingRule>> {
        let result = entity::routing_rule::Entity::find_by_id(id.as_i64())
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_rules_for_node(&self, node_id: NodeId) -> Result<Vec<RoutingRule>> {
        let results = entity::routing_rule::Entity::find()
            .filter(entity::routing_rule::Column::NodeId.eq(node_id.as_i64()))
            .order_by_asc(entity::routing_rule::Column::Sort)
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn list_all_rules(&self) -> Result<Vec<RoutingRule>> {
        let results = entity::routing_rule::Entity::find()
            .order_by_asc(entity::routing_rule::Column::Sort)
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update_routing_rule(&self, rule: &RoutingRule) -> Result<RoutingRule> {
        let model: entity::routing_rule::ActiveModel = rule.into();
        let result = model.update(&self.conn).await?;
        Ok(result.into())
    }

    async fn delete_routing_rule(&self, id: RuleId) -> Result<()> {
        entity::routing_rule::Entity::delete_by_id(id.as_i64())
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // account operations

    async fn create_account(&self, account: &Account) -> Result<Account> {
        let model: entity::account::ActiveModel = account.into();
        let result = model.insert(&self.conn).await?;
        Ok(result.into())
    }

    async fn get_account(&self, id: AccountId) -> Result<Option<Account>> {
        let result = entity::account::Entity::find_by_id(id.as_i64())
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_accounts(&self) -> Result<Vec<Account>> {
        let results = entity::account::Entity::find().all(&self.conn).await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn list_enabled_accounts(&self) -> Result<Vec<Account>> {
        let results = entity::account::Entity::find()
            .filter(entity::account::Column::Enable.eq(true))
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    async fn update_account(&self, account: &Account) -> Result<Account> {
        let mut model: entity::account::ActiveModel = account.into();
        model.updated_at = Set(Utc::now());
        let result = model.update(&self.conn).await?;
        Ok(result.into())
    }

    async fn delete_account(&self, id: AccountId) -> Result<()> {
        entity::account::Entity::delete_by_id(id.as_i64())
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    // account client operations

    async fn add_account_client(&self, client: &AccountClient) -> Result<()> {
        let model: entity::account_client::ActiveModel = client.into();
        model.insert(&self.conn).await?;
        Ok(())
    }

    async fn remove_account_client(
        &self,
        account_id: AccountId,
        inbound_id: InboundId,
        email: &str,
    ) -> Result<()> {
        entity::account_client::Entity::delete_many()
            .filter(entity::account_client::Column::AccountId.eq(account_id.as_i64()))
            .filter(entity::account_client::Column::InboundId.eq(inbound_id.as_i64()))
            .filter(entity::account_client::Column::Email.eq(email))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn list_account_clients(&self, account_id: AccountId) -> Result<Vec<AccountClient>> {
        let results = entity::account_client::Entity::find()
            .filter(entity::account_client::Column::AccountId.eq(account_id.as_i64()))
            .all(&self.conn)
            .await?;
        Ok(results.into_iter().map(Into::into).collect())
    }

    // client traffic operations

    async fn record_client_traffic(
        &self,
        inbound_id: InboundId,
        email: &str,
        up: i64,
        down: i64,
    ) -> Result<()> {
        let existing = entity::client_traffic::Entity::find()
            .filter(entity::client_traffic::Column::InboundId.eq(inbound_id.as_i64()))
            .filter(entity::client_traffic::Column::Email.eq(email))
            .one(&self.conn)
            .await?;

        match existing {
            Some(row) => {
                let mut model: entity::client_traffic::ActiveModel = row.clone().into();
                model.up = Set(row.up + up);
                model.down = Set(row.down + down);
                model.update(&self.conn).await?;
            }
            None => {
                let traffic = ClientTraffic {
                    inbound_id,
                    email: email.to_string(),
                    up,
                    down,
                    enable: true,
                };
                let model: entity::client_traffic::ActiveModel = (&traffic).into();
                model.insert(&self.conn).await?;
            }
        }
        Ok(())
    }

    async fn get_client_traffic(
        &self,
        inbound_id: InboundId,
        email: &str,
    ) -> Result<Option<ClientTraffic>> {
        let result = entity::client_traffic::Entity::find()
            .filter(entity::client_traffic::Column::InboundId.eq(inbound_id.as_i64()))
            .filter(entity::client_traffic::Column::Email.eq(email))
            .one(&self.conn)
            .await?;
        Ok(result.map(Into::into))
    }

    async fn list_traffic_for_account(&self, account_id: AccountId) -> Result<Vec<ClientTraffic>> {
        let clients = self.list_account_clients(account_id).await?;
        let mut traffic = Vec::with_capacity(clients.len());
        for client in clients {
            if let Some(row) = self
                .get_client_traffic(client.inbound_id, &client.email)
                .await?
            {
                traffic.push(row);
            }
        }
        Ok(traffic)
    }

    async fn set_client_traffic_enabled(
        &self,
        inbound_id: InboundId,
        email: &str,
        enabled: bool,
    ) -> Result<()> {
        entity::client_traffic::Entity::update_many()
            .col_expr(
                entity::client_traffic::Column::Enable,
                sea_orm::sea_query::Expr::value(enabled),
            )
            .filter(entity::client_traffic::Column::InboundId.eq(inbound_id.as_i64()))
            .filter(entity::client_traffic::Column::Email.eq(email))
            .exec(&self.conn)
            .await?;
        Ok(())
    }

    async fn reset_account_traffic(&self, account_id: AccountId) -> Result<()> {
        let clients = self.list_account_clients(account_id).await?;
        for client in clients {
            entity::client_traffic::Entity::update_many()
                .col_expr(
                    entity::client_traffic::Column::Up,
                    sea_orm::sea_query::Expr::value(0i64),
                )
                .col_expr(
                    entity::client_traffic::Column::Down,
                    sea_orm::sea_query::Expr::value(0i64),
                )
                .filter(entity::client_traffic::Column::InboundId.eq(client.inbound_id.as_i64()))
                .filter(entity::client_traffic::Column::Email.eq(&client.email))
                .exec(&self.conn)
                .await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proxyctl_types::test_utils::{
        TestAccountBuilder, TestInboundBuilder, TestNodeBuilder, TestOutboundBuilder,
        TestRuleBuilder,
    };

    async fn setup_test_db() -> ProxyctlDb {
        ProxyctlDb::new_in_memory().await.unwrap()
    }

    async fn create_test_node(db: &ProxyctlDb) -> Node {
        let mut node = TestNodeBuilder::new(1).build();
        node.id = NodeId(0); // let the database assign
        db.create_node(&node).await.unwrap()
    }

    #[tokio::test]
    async fn node_round_trip() {
        let db = setup_test_db().await;
        let node = create_test_node(&db).await;
        assert_ne!(node.id.0, 0);

        let fetched = db.get_node(node.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, node.name);
        assert_eq!(fetched.secret, node.secret);
        assert_eq!(fetched.status, NodeStatus::Unknown);

        let by_name = db.get_node_by_name(&node.name).await.unwrap().unwrap();
        assert_eq!(by_name.id, node.id);

        assert!(db.get_node(NodeId(999)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn set_node_status_updates_last_seen() {
        let db = setup_test_db().await;
        let node = create_test_node(&db).await;

        let now = Utc::now();
        db.set_node_status(node.id, NodeStatus::Connected, Some(now))
            .await
            .unwrap();

        let fetched = db.get_node(node.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, NodeStatus::Connected);
        assert!(fetched.last_seen.is_some());

        // disconnect without touching last_seen
        db.set_node_status(node.id, NodeStatus::Disconnected, None)
            .await
            .unwrap();
        let fetched = db.get_node(node.id).await.unwrap().unwrap();
        assert_eq!(fetched.status, NodeStatus::Disconnected);
        assert!(fetched.last_seen.is_some());
    }

    #[tokio::test]
    async fn inbound_crud_and_per_node_listing() {
        let db = setup_test_db().await;
        let node = create_test_node(&db).await;
        let other = db
            .create_node(&TestNodeBuilder::new(0).with_name("other").build())
            .await
            .unwrap();

        let mut inbound = TestInboundBuilder::new(0, node.id.0)
            .with_tag("vmess-in")
            .with_settings(r#"{"clients":[]}"#)
            .build();
        inbound = db.create_inbound(&inbound).await.unwrap();

        db.create_inbound(&TestInboundBuilder::new(0, other.id.0).with_tag("elsewhere").build())
            .await
            .unwrap();

        let listed = db.list_inbounds_for_node(node.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].tag, "vmess-in");
        // opaque payload survives byte-for-byte
        assert_eq!(listed[0].settings, r#"{"clients":[]}"#);

        let mut updated = listed[0].clone();
        updated.port = 20000;
        db.update_inbound(&updated).await.unwrap();
        assert_eq!(
            db.get_inbound(inbound.id).await.unwrap().unwrap().port,
            20000
        );

        db.delete_inbound(inbound.id).await.unwrap();
        assert!(db.get_inbound(inbound.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn outbound_listing_per_node_and_global() {
        let db = setup_test_db().await;
        let a = create_test_node(&db).await;
        let b = db
            .create_node(&TestNodeBuilder::new(0).with_name("node-b").build())
            .await
            .unwrap();

        db.create_outbound(&TestOutboundBuilder::new(0, a.id.0).with_tag("out-a").build())
            .await
            .unwrap();
        db.create_outbound(&TestOutboundBuilder::new(0, b.id.0).with_tag("out-b").build())
            .await
            .unwrap();

        assert_eq!(db.list_outbounds_for_node(a.id).await.unwrap().len(), 1);
        assert_eq!(db.list_all_outbounds().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn rules_listed_in_sort_order_regardless_of_insertion() {
        let db = setup_test_db().await;
        let node = create_test_node(&db).await;

        for (sort, tag) in [(5, "last"), (0, "first"), (3, "middle")] {
            db.create_routing_rule(
                &TestRuleBuilder::new(0, node.id.0)
                    .with_sort(sort)
                    .with_outbound_tag(tag)
                    .build(),
            )
            .await
            .unwrap();
        }

        let rules = db.list_rules_for_node(node.id).await.unwrap();
        let tags: Vec<_> = rules.iter().map(|r| r.outbound_tag.as_str()).collect();
        assert_eq!(tags, ["first", "middle", "last"]);
    }

    #[tokio::test]
    async fn enabled_account_listing_filters() {
        let db = setup_test_db().await;
        db.create_account(&TestAccountBuilder::new(0).build())
            .await
            .unwrap();
        db.create_account(&TestAccountBuilder::new(0).with_enable(false).build())
            .await
            .unwrap();

        assert_eq!(db.list_accounts().await.unwrap().len(), 2);
        assert_eq!(db.list_enabled_accounts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn traffic_upsert_accumulates() {
        let db = setup_test_db().await;
        let node = create_test_node(&db).await;
        let inbound = db
            .create_inbound(&TestInboundBuilder::new(0, node.id.0).build())
            .await
            .unwrap();

        db.record_client_traffic(inbound.id, "a@x", 100, 200)
            .await
            .unwrap();
        db.record_client_traffic(inbound.id, "a@x", 10, 20)
            .await
            .unwrap();

        let traffic = db
            .get_client_traffic(inbound.id, "a@x")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(traffic.up, 110);
        assert_eq!(traffic.down, 220);
        assert!(traffic.enable);
    }

    #[tokio::test]
    async fn account_traffic_spans_inbounds() {
        let db = setup_test_db().await;
        let node = create_test_node(&db).await;
        let in_a = db
            .create_inbound(&TestInboundBuilder::new(0, node.id.0).with_tag("a").build())
            .await
            .unwrap();
        let in_b = db
            .create_inbound(&TestInboundBuilder::new(0, node.id.0).with_tag("b").build())
            .await
            .unwrap();

        let account = db
            .create_account(&TestAccountBuilder::new(0).with_quota(1000).build())
            .await
            .unwrap();
        for (inbound, email) in [(&in_a, "a@x"), (&in_b, "b@x")] {
            db.add_account_client(&AccountClient {
                account_id: account.id,
                inbound_id: inbound.id,
                email: email.to_string(),
            })
            .await
            .unwrap();
        }

        db.record_client_traffic(in_a.id, "a@x", 300, 0).await.unwrap();
        db.record_client_traffic(in_b.id, "b@x", 0, 400).await.unwrap();
        // a client not in the account is not counted
        db.record_client_traffic(in_a.id, "stranger@x", 999, 999)
            .await
            .unwrap();

        let traffic = db.list_traffic_for_account(account.id).await.unwrap();
        let used: i64 = traffic.iter().map(|t| t.total()).sum();
        assert_eq!(used, 700);

        db.reset_account_traffic(account.id).await.unwrap();
        let traffic = db.list_traffic_for_account(account.id).await.unwrap();
        assert!(traffic.iter().all(|t| t.total() == 0));
        // stranger's counters are untouched
        let stranger = db
            .get_client_traffic(in_a.id, "stranger@x")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stranger.total(), 1998);
    }

    #[tokio::test]
    async fn traffic_enable_flag_mirrors() {
        let db = setup_test_db().await;
        let node = create_test_node(&db).await;
        let inbound = db
            .create_inbound(&TestInboundBuilder::new(0, node.id.0).build())
            .await
            .unwrap();

        db.record_client_traffic(inbound.id, "a@x", 1, 1).await.unwrap();
        db.set_client_traffic_enabled(inbound.id, "a@x", false)
            .await
            .unwrap();

        let traffic = db
            .get_client_traffic(inbound.id, "a@x")
            .await
            .unwrap()
            .unwrap();
        assert!(!traffic.enable);
    }

    #[tokio::test]
    async fn deleting_node_cascades_to_owned_records() {
        let db = setup_test_db().await;
        let node = create_test_node(&db).await;
        let inbound = db
            .create_inbound(&TestInboundBuilder::new(0, node.id.0).build())
            .await
            .unwrap();
        db.create_outbound(&TestOutboundBuilder::new(0, node.id.0).build())
            .await
            .unwrap();
        db.create_routing_rule(&TestRuleBuilder::new(0, node.id.0).build())
            .await
            .unwrap();

        db.delete_node(node.id).await.unwrap();
        assert!(db.get_inbound(inbound.id).await.unwrap().is_none());
        assert!(db.list_outbounds_for_node(node.id).await.unwrap().is_empty());
        assert!(db.list_rules_for_node(node.id).await.unwrap().is_empty());
    }
}

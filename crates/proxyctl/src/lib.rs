//! proxyctl library - the master's application setup and core loops.
//!
//! this crate provides the control-plane runtime:
//! - [`handlers`]: the node-facing websocket endpoint and health probe
//! - [`registry`]: the map from node id to active delivery channel
//! - [`push`]: the push transport delivering compiled configuration
//! - [`policy`]: the account quota/expiry enforcement loop
//! - [`ops`]: state mutations and the re-pushes they trigger
//! - [`cli`]: command-line interface (serve, agent)

#![warn(missing_docs)]

/// command-line interface implementation.
pub mod cli;
/// http request handlers for node-facing endpoints.
pub mod handlers;
mod ops;
mod policy;
mod push;
mod registry;

pub use ops::{SyncReport, update_inbound, update_outbound, update_routing_rule};
pub use policy::{AccountEnforcer, EnforcementReport};
pub use push::{ConfigPusher, PushError, compile_for_node, detect_node_drift};
pub use registry::{AckOutcome, NodeCommand, NodeRegistry};

use std::time::Duration;

use axum::{Router, routing::get};
use proxyctl_db::ProxyctlDb;
use proxyctl_types::Config;

/// shared application state for the master.
#[derive(Clone)]
pub struct AppState {
    /// database connection for persistent storage.
    pub db: ProxyctlDb,
    /// server configuration.
    pub config: Config,
    /// registry of connected nodes and their channels.
    pub registry: NodeRegistry,
    /// the push transport.
    pub pusher: ConfigPusher,
}

impl AppState {
    /// assemble the application state from a database and configuration.
    pub fn new(db: ProxyctlDb, config: Config) -> Self {
        let registry = NodeRegistry::new();
        let pusher = ConfigPusher::new(
            db.clone(),
            registry.clone(),
            Duration::from_secs(config.push.ack_timeout_secs),
        );
        Self {
            db,
            config,
            registry,
            pusher,
        }
    }
}

/// create the axum application with all routes.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(handlers::health))
        .route("/node/ws", get(handlers::node_ws))
        .with_state(state)
}

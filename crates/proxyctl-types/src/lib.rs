//! core types for proxyctl - a proxy fleet control plane.
//!
//! this crate provides the fundamental data structures used throughout proxyctl:
//! - [`node`]: a remote host running the proxy engine, managed by the master
//! - [`inbound`]: listener definitions and the clients embedded in them
//! - [`outbound`]: egress route definitions
//! - [`routing_rule`]: ordered match-and-dispatch rules
//! - [`account`]: billing/policy groupings with traffic quota and expiry
//! - [`config`]: application configuration

#![warn(missing_docs)]

mod account;
mod config;
mod inbound;
mod node;
mod outbound;
mod routing_rule;

/// builders for test fixtures.
pub mod test_utils;

pub use account::{Account, AccountClient, AccountId, ClientTraffic};
pub use config::{Config, DatabaseConfig, EngineConfig, PolicyConfig, PushConfig};
pub use inbound::{Client, Inbound, InboundId};
pub use node::{Node, NodeId, NodeStatus};
pub use outbound::{Outbound, OutboundId};
pub use routing_rule::{RoutingRule, RuleId};

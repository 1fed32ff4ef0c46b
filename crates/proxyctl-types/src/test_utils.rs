//! test utilities for creating fixture records.
//!
//! this module provides builder patterns for creating test instances
//! of proxyctl types without needing to specify all fields.

use chrono::{DateTime, Utc};

use crate::{
    Account, AccountId, Inbound, InboundId, Node, NodeId, Outbound, OutboundId, RoutingRule,
    RuleId,
};

/// builder for creating test [`Node`] instances.
#[derive(Debug, Clone)]
pub struct TestNodeBuilder {
    id: i64,
    name: Option<String>,
    secret: Option<String>,
}

impl TestNodeBuilder {
    /// create a new builder with the given node id.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            name: None,
            secret: None,
        }
    }

    /// set a custom name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// set a custom shared secret.
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(secret.into());
        self
    }

    /// build the [`Node`].
    pub fn build(self) -> Node {
        let name = self.name.unwrap_or_else(|| format!("node-{}", self.id));
        let mut node = Node::new(
            name,
            "127.0.0.1".to_string(),
            self.secret.unwrap_or_else(|| format!("secret-{}", self.id)),
        );
        node.id = NodeId(self.id);
        node
    }
}

/// builder for creating test [`Inbound`] instances.
#[derive(Debug, Clone)]
pub struct TestInboundBuilder {
    id: i64,
    node_id: i64,
    tag: Option<String>,
    port: u16,
    protocol: String,
    listen: String,
    settings: String,
    stream_settings: String,
    sniffing: String,
    enable: bool,
}

impl TestInboundBuilder {
    /// create a new builder with the given inbound and node ids.
    pub fn new(id: i64, node_id: i64) -> Self {
        Self {
            id,
            node_id,
            tag: None,
            port: 10000 + id as u16,
            protocol: "vmess".to_string(),
            listen: String::new(),
            settings: String::new(),
            stream_settings: String::new(),
            sniffing: String::new(),
            enable: true,
        }
    }

    /// set the tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// set the listener port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// set the protocol.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// set the listen address.
    pub fn with_listen(mut self, listen: impl Into<String>) -> Self {
        self.listen = listen.into();
        self
    }

    /// set the opaque settings payload.
    pub fn with_settings(mut self, settings: impl Into<String>) -> Self {
        self.settings = settings.into();
        self
    }

    /// set the opaque stream settings payload.
    pub fn with_stream_settings(mut self, stream_settings: impl Into<String>) -> Self {
        self.stream_settings = stream_settings.into();
        self
    }

    /// set the opaque sniffing payload.
    pub fn with_sniffing(mut self, sniffing: impl Into<String>) -> Self {
        self.sniffing = sniffing.into();
        self
    }

    /// set the enable flag.
    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    /// build the [`Inbound`].
    pub fn build(self) -> Inbound {
        Inbound {
            id: InboundId(self.id),
            node_id: NodeId(self.node_id),
            tag: self.tag.unwrap_or_else(|| format!("in-{}", self.id)),
            listen: self.listen,
            port: self.port,
            protocol: self.protocol,
            settings: self.settings,
            stream_settings: self.stream_settings,
            sniffing: self.sniffing,
            remark: String::new(),
            enable: self.enable,
        }
    }
}

/// builder for creating test [`Outbound`] instances.
#[derive(Debug, Clone)]
pub struct TestOutboundBuilder {
    id: i64,
    node_id: i64,
    tag: Option<String>,
    protocol: String,
    settings: String,
    stream_settings: String,
    mux: String,
    proxy_settings: String,
    send_through: String,
    enable: bool,
}

impl TestOutboundBuilder {
    /// create a new builder with the given outbound and node ids.
    pub fn new(id: i64, node_id: i64) -> Self {
        Self {
            id,
            node_id,
            tag: None,
            protocol: "freedom".to_string(),
            settings: String::new(),
            stream_settings: String::new(),
            mux: String::new(),
            proxy_settings: String::new(),
            send_through: String::new(),
            enable: true,
        }
    }

    /// set the tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// set the protocol.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocol = protocol.into();
        self
    }

    /// set the opaque settings payload.
    pub fn with_settings(mut self, settings: impl Into<String>) -> Self {
        self.settings = settings.into();
        self
    }

    /// set the opaque stream settings payload.
    pub fn with_stream_settings(mut self, stream_settings: impl Into<String>) -> Self {
        self.stream_settings = stream_settings.into();
        self
    }

    /// set the opaque mux payload.
    pub fn with_mux(mut self, mux: impl Into<String>) -> Self {
        self.mux = mux.into();
        self
    }

    /// set the opaque proxy-chaining payload.
    pub fn with_proxy_settings(mut self, proxy_settings: impl Into<String>) -> Self {
        self.proxy_settings = proxy_settings.into();
        self
    }

    /// set the explicit source address.
    pub fn with_send_through(mut self, send_through: impl Into<String>) -> Self {
        self.send_through = send_through.into();
        self
    }

    /// set the enable flag.
    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    /// build the [`Outbound`].
    pub fn build(self) -> Outbound {
        Outbound {
            id: OutboundId(self.id),
            node_id: NodeId(self.node_id),
            tag: self.tag.unwrap_or_else(|| format!("out-{}", self.id)),
            protocol: self.protocol,
            settings: self.settings,
            stream_settings: self.stream_settings,
            mux: self.mux,
            proxy_settings: self.proxy_settings,
            send_through: self.send_through,
            enable: self.enable,
        }
    }
}

/// builder for creating test [`RoutingRule`] instances.
#[derive(Debug, Clone)]
pub struct TestRuleBuilder {
    id: i64,
    node_id: i64,
    sort: i32,
    outbound_tag: String,
    domain: String,
    ip: String,
    user: String,
}

impl TestRuleBuilder {
    /// create a new builder with the given rule and node ids.
    pub fn new(id: i64, node_id: i64) -> Self {
        Self {
            id,
            node_id,
            sort: 0,
            outbound_tag: "direct".to_string(),
            domain: String::new(),
            ip: String::new(),
            user: String::new(),
        }
    }

    /// set the sort key.
    pub fn with_sort(mut self, sort: i32) -> Self {
        self.sort = sort;
        self
    }

    /// set the outbound tag.
    pub fn with_outbound_tag(mut self, tag: impl Into<String>) -> Self {
        self.outbound_tag = tag.into();
        self
    }

    /// set the raw domain match list.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = domain.into();
        self
    }

    /// set the raw ip match list.
    pub fn with_ip(mut self, ip: impl Into<String>) -> Self {
        self.ip = ip.into();
        self
    }

    /// set the raw user match list.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = user.into();
        self
    }

    /// build the [`RoutingRule`].
    pub fn build(self) -> RoutingRule {
        RoutingRule {
            id: RuleId(self.id),
            node_id: NodeId(self.node_id),
            rule_type: "field".to_string(),
            domain: self.domain,
            ip: self.ip,
            port: String::new(),
            network: String::new(),
            source: String::new(),
            user: self.user,
            inbound_tag: String::new(),
            outbound_tag: self.outbound_tag,
            balancer_tag: String::new(),
            sort: self.sort,
        }
    }
}

/// builder for creating test [`Account`] instances.
#[derive(Debug, Clone)]
pub struct TestAccountBuilder {
    id: i64,
    quota: i64,
    expiry: Option<DateTime<Utc>>,
    enable: bool,
}

impl TestAccountBuilder {
    /// create a new builder with the given account id.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            quota: 0,
            expiry: None,
            enable: true,
        }
    }

    /// set the quota in bytes.
    pub fn with_quota(mut self, quota: i64) -> Self {
        self.quota = quota;
        self
    }

    /// set the expiry timestamp.
    pub fn with_expiry(mut self, expiry: DateTime<Utc>) -> Self {
        self.expiry = Some(expiry);
        self
    }

    /// set the enable flag.
    pub fn with_enable(mut self, enable: bool) -> Self {
        self.enable = enable;
        self
    }

    /// build the [`Account`].
    pub fn build(self) -> Account {
        let mut account = Account::new(format!("account-{}", self.id), self.quota);
        account.id = AccountId(self.id);
        account.expiry = self.expiry;
        account.enable = self.enable;
        account
    }
}

//! compiles relational records into the engine's configuration document.
//!
//! the external engine parses the document strictly, so field presence
//! is part of the contract: opaque payloads appear only when non-empty,
//! and are embedded verbatim - the compiler never interprets them.

use serde::Serialize;
use serde_json::value::RawValue;

use proxyctl_types::{Inbound, Outbound, RoutingRule};

use crate::{Error, Result};

/// the configuration document consumed by the proxy engine.
///
/// always the complete desired state for one node:
/// `{"inbounds": [...], "outbounds": [...], "routing": {"rules": [...]}}`.
#[derive(Debug, Serialize)]
pub struct CompiledConfig {
    /// listener stanzas, one per enabled inbound.
    pub inbounds: Vec<InboundStanza>,
    /// egress stanzas, one per enabled outbound.
    pub outbounds: Vec<OutboundStanza>,
    /// the routing section with its ordered rules.
    pub routing: RoutingSection,
}

impl CompiledConfig {
    /// serialize the document to its wire form.
    pub fn to_json(&self) -> String {
        // the document is built from values that already serialized once;
        // re-serialization cannot fail
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// convert to a generic JSON value, e.g. for drift comparison.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

/// the `routing` section of the compiled document.
#[derive(Debug, Serialize)]
pub struct RoutingSection {
    /// rules in ascending sort-key order.
    pub rules: Vec<RuleStanza>,
}

/// one entry of the compiled `inbounds` list.
#[derive(Debug, Serialize)]
pub struct InboundStanza {
    /// inbound tag.
    pub tag: String,
    /// listen address, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listen: Option<String>,
    /// listener port.
    pub port: u16,
    /// protocol name.
    pub protocol: String,
    /// protocol settings, verbatim, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Box<RawValue>>,
    /// stream settings, verbatim, omitted when empty.
    #[serde(rename = "streamSettings", skip_serializing_if = "Option::is_none")]
    pub stream_settings: Option<Box<RawValue>>,
    /// sniffing settings, verbatim, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sniffing: Option<Box<RawValue>>,
}

/// one entry of the compiled `outbounds` list.
#[derive(Debug, Serialize)]
pub struct OutboundStanza {
    /// outbound tag.
    pub tag: String,
    /// protocol name.
    pub protocol: String,
    /// explicit source address, omitted when empty.
    #[serde(rename = "sendThrough", skip_serializing_if = "Option::is_none")]
    pub send_through: Option<String>,
    /// protocol settings, verbatim, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub settings: Option<Box<RawValue>>,
    /// stream settings, verbatim, omitted when empty.
    #[serde(rename = "streamSettings", skip_serializing_if = "Option::is_none")]
    pub stream_settings: Option<Box<RawValue>>,
    /// multiplexing settings, verbatim, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mux: Option<Box<RawValue>>,
    /// proxy-chaining settings, verbatim, omitted when empty or when the
    /// trimmed payload is the empty-object literal.
    #[serde(rename = "proxySettings", skip_serializing_if = "Option::is_none")]
    pub proxy_settings: Option<Box<RawValue>>,
}

/// one entry of the compiled routing `rules` list.
///
/// `type`, `port`, `network`, `outboundTag` and `balancerTag` are always
/// present, even when empty; the list-valued match fields appear only
/// when their stored value is non-empty. the sort key is never emitted.
#[derive(Debug, Serialize)]
pub struct RuleStanza {
    /// rule type.
    #[serde(rename = "type")]
    pub rule_type: String,
    /// domain match list, verbatim, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<Box<RawValue>>,
    /// ip match list, verbatim, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip: Option<Box<RawValue>>,
    /// port match expression.
    pub port: String,
    /// network match.
    pub network: String,
    /// source match list, verbatim, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Box<RawValue>>,
    /// user match list, verbatim, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Box<RawValue>>,
    /// inbound tag match list, verbatim, omitted when empty.
    #[serde(rename = "inboundTag", skip_serializing_if = "Option::is_none")]
    pub inbound_tag: Option<Box<RawValue>>,
    /// outbound tag the rule dispatches to.
    #[serde(rename = "outboundTag")]
    pub outbound_tag: String,
    /// balancer tag the rule dispatches to.
    #[serde(rename = "balancerTag")]
    pub balancer_tag: String,
}

/// compile one node's records into its configuration document.
///
/// the caller decides node targeting: the record slices are expected to
/// belong to a single node (or, for administrative cross-node listings,
/// to whatever set the caller assembled). disabled inbounds/outbounds
/// are skipped; rules are emitted in ascending sort-key order regardless
/// of slice order. a node with no records compiles to a minimally valid
/// document with empty lists.
pub fn compile(
    inbounds: &[Inbound],
    outbounds: &[Outbound],
    rules: &[RoutingRule],
) -> Result<CompiledConfig> {
    let inbounds = inbounds
        .iter()
        .filter(|i| i.enable)
        .map(compile_inbound)
        .collect::<Result<Vec<_>>>()?;

    let outbounds = outbounds
        .iter()
        .filter(|o| o.enable)
        .map(compile_outbound)
        .collect::<Result<Vec<_>>>()?;

    let mut ordered: Vec<&RoutingRule> = rules.iter().collect();
    ordered.sort_by_key(|r| r.sort);
    let rules = ordered
        .into_iter()
        .map(compile_rule)
        .collect::<Result<Vec<_>>>()?;

    Ok(CompiledConfig {
        inbounds,
        outbounds,
        routing: RoutingSection { rules },
    })
}

/// compile a single inbound into its stanza.
pub fn compile_inbound(inbound: &Inbound) -> Result<InboundStanza> {
    Ok(InboundStanza {
        tag: inbound.tag.clone(),
        listen: non_empty(&inbound.listen),
        port: inbound.port,
        protocol: inbound.protocol.clone(),
        settings: raw_opt(&inbound.tag, "settings", &inbound.settings)?,
        stream_settings: raw_opt(&inbound.tag, "streamSettings", &inbound.stream_settings)?,
        sniffing: raw_opt(&inbound.tag, "sniffing", &inbound.sniffing)?,
    })
}

/// compile a single outbound into its stanza.
pub fn compile_outbound(outbound: &Outbound) -> Result<OutboundStanza> {
    // a bare `{}` proxySettings stanza makes the engine treat the
    // outbound as chained; suppress it like the empty string
    let proxy_settings = if outbound.proxy_settings.trim() == "{}" {
        None
    } else {
        raw_opt(&outbound.tag, "proxySettings", &outbound.proxy_settings)?
    };

    Ok(OutboundStanza {
        tag: outbound.tag.clone(),
        protocol: outbound.protocol.clone(),
        send_through: non_empty(&outbound.send_through),
        settings: raw_opt(&outbound.tag, "settings", &outbound.settings)?,
        stream_settings: raw_opt(&outbound.tag, "streamSettings", &outbound.stream_settings)?,
        mux: raw_opt(&outbound.tag, "mux", &outbound.mux)?,
        proxy_settings,
    })
}

/// compile a single routing rule into its stanza.
pub fn compile_rule(rule: &RoutingRule) -> Result<RuleStanza> {
    let tag = if rule.outbound_tag.is_empty() {
        &rule.balancer_tag
    } else {
        &rule.outbound_tag
    };

    Ok(RuleStanza {
        rule_type: rule.rule_type.clone(),
        domain: raw_opt(tag, "domain", &rule.domain)?,
        ip: raw_opt(tag, "ip", &rule.ip)?,
        port: rule.port.clone(),
        network: rule.network.clone(),
        source: raw_opt(tag, "source", &rule.source)?,
        user: raw_opt(tag, "user", &rule.user)?,
        inbound_tag: raw_opt(tag, "inboundTag", &rule.inbound_tag)?,
        outbound_tag: rule.outbound_tag.clone(),
        balancer_tag: rule.balancer_tag.clone(),
    })
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// embed a stored payload verbatim, or omit it when empty.
fn raw_opt(tag: &str, field: &'static str, value: &str) -> Result<Option<Box<RawValue>>> {
    if value.is_empty() {
        return Ok(None);
    }
    RawValue::from_string(value.to_string())
        .map(Some)
        .map_err(|source| Error::MalformedStoredConfig {
            tag: tag.to_string(),
            field,
            source,
        })
}

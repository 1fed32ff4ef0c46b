//! inbound listener definitions and the clients embedded in them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::NodeId;

/// unique identifier for an inbound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InboundId(pub i64);

impl InboundId {
    /// convert to i64 for database storage.
    pub fn as_i64(self) -> i64 {
        self.0
    }
}

impl From<i64> for InboundId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for InboundId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// a listener definition owned by exactly one node.
///
/// `settings`, `stream_settings` and `sniffing` are opaque JSON payloads
/// whose shape depends on `protocol`; the master stores and forwards them
/// without interpreting them, except for the `"clients"` array inside
/// `settings` which the policy layer rewrites when disabling credentials.
///
/// invariant: `(node_id, tag)` is unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Inbound {
    /// unique identifier.
    pub id: InboundId,

    /// owning node.
    pub node_id: NodeId,

    /// tag, unique per node; the join key for drift detection.
    pub tag: String,

    /// listen address; empty means the engine's default.
    pub listen: String,

    /// listener port.
    pub port: u16,

    /// protocol name (e.g. "vmess", "vless", "trojan").
    pub protocol: String,

    /// protocol-specific settings, opaque JSON text.
    pub settings: String,

    /// stream/transport settings, opaque JSON text.
    pub stream_settings: String,

    /// traffic sniffing settings, opaque JSON text.
    pub sniffing: String,

    /// free-form administrative note.
    pub remark: String,

    /// disabled inbounds are excluded from the compiled document.
    pub enable: bool,
}

impl Inbound {
    /// parse the clients embedded in the `settings` payload.
    ///
    /// a missing or empty `"clients"` array yields an empty list; a
    /// settings payload that is not valid JSON also yields an empty list
    /// (the compiler passes such payloads through opaquely, and the
    /// policy layer has nothing it can rewrite in them).
    pub fn clients(&self) -> Vec<Client> {
        let Ok(value) = serde_json::from_str::<Value>(&self.settings) else {
            return Vec::new();
        };
        match value.get("clients") {
            Some(clients) => serde_json::from_value(clients.clone()).unwrap_or_default(),
            None => Vec::new(),
        }
    }

    /// set the `enable` flag of the embedded client with the given email,
    /// rewriting the `settings` payload in place.
    ///
    /// unknown fields on the client record are preserved verbatim.
    /// returns `true` if a client's flag actually changed.
    pub fn set_client_enabled(&mut self, email: &str, enabled: bool) -> bool {
        let Ok(mut value) = serde_json::from_str::<Value>(&self.settings) else {
            return false;
        };
        let Some(clients) = value.get_mut("clients").and_then(Value::as_array_mut) else {
            return false;
        };

        let mut changed = false;
        for client in clients.iter_mut() {
            let matches = client.get("email").and_then(Value::as_str) == Some(email);
            if !matches {
                continue;
            }
            // absent "enable" means enabled
            let current = client.get("enable").and_then(Value::as_bool).unwrap_or(true);
            if current != enabled {
                if let Some(obj) = client.as_object_mut() {
                    obj.insert("enable".to_string(), Value::Bool(enabled));
                    changed = true;
                }
            }
        }

        if changed {
            self.settings = value.to_string();
        }
        changed
    }
}

/// a single proxy credential embedded in an inbound's `settings` payload.
///
/// clients belong to an [`Account`](crate::Account) via the account-client
/// association; the credential itself lives only inside the inbound.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Client {
    /// credential identifier (uuid or password, protocol dependent).
    #[serde(default)]
    pub id: String,

    /// unique email/identifier used to correlate traffic and accounts.
    #[serde(default)]
    pub email: String,

    /// per-client flow control setting.
    #[serde(default)]
    pub flow: String,

    /// whether the credential is currently active.
    #[serde(default = "default_enable")]
    pub enable: bool,
}

fn default_enable() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TestInboundBuilder;

    const SETTINGS: &str = r#"{"clients":[{"id":"uuid-1","email":"a@x","enable":true,"limitIp":2},{"id":"uuid-2","email":"b@x"}],"decryption":"none"}"#;

    #[test]
    fn clients_parses_embedded_array() {
        let inbound = TestInboundBuilder::new(1, 1).with_settings(SETTINGS).build();
        let clients = inbound.clients();
        assert_eq!(clients.len(), 2);
        assert_eq!(clients[0].email, "a@x");
        assert!(clients[0].enable);
        // absent enable defaults to true
        assert!(clients[1].enable);
    }

    #[test]
    fn clients_tolerates_missing_array_and_bad_json() {
        let empty = TestInboundBuilder::new(1, 1).with_settings("{}").build();
        assert!(empty.clients().is_empty());

        let broken = TestInboundBuilder::new(1, 1).with_settings("{not json").build();
        assert!(broken.clients().is_empty());
    }

    #[test]
    fn set_client_enabled_rewrites_only_the_target() {
        let mut inbound = TestInboundBuilder::new(1, 1).with_settings(SETTINGS).build();
        assert!(inbound.set_client_enabled("a@x", false));

        let clients = inbound.clients();
        assert!(!clients[0].enable);
        assert!(clients[1].enable);

        // unknown fields survive the rewrite
        assert!(inbound.settings.contains("limitIp"));
        assert!(inbound.settings.contains("decryption"));
    }

    #[test]
    fn set_client_enabled_is_idempotent() {
        let mut inbound = TestInboundBuilder::new(1, 1).with_settings(SETTINGS).build();
        assert!(inbound.set_client_enabled("a@x", false));
        // second disable is a no-op
        assert!(!inbound.set_client_enabled("a@x", false));
    }

    #[test]
    fn set_client_enabled_unknown_email_is_noop() {
        let mut inbound = TestInboundBuilder::new(1, 1).with_settings(SETTINGS).build();
        let before = inbound.settings.clone();
        assert!(!inbound.set_client_enabled("nobody@x", false));
        assert_eq!(inbound.settings, before);
    }
}

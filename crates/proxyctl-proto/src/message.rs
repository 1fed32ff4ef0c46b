//! channel frames exchanged between master and node.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::{Error, Result};

/// frames sent by a node to the master.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeFrame {
    /// registration handshake; must be the first frame on the channel.
    Hello {
        /// the node's configured name.
        name: String,
        /// the node's pre-shared secret.
        secret: String,
    },

    /// acknowledgment of a configuration push.
    Ack {
        /// the push this acknowledges.
        push_id: u64,
        /// whether the node applied the document.
        applied: bool,
        /// failure reason when `applied` is false.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// traffic telemetry gathered from the node's engine.
    Traffic {
        /// aggregate upload bytes since the last report.
        up: i64,
        /// aggregate download bytes since the last report.
        down: i64,
        /// per-client counters since the last report.
        #[serde(default)]
        clients: Vec<ClientCounters>,
    },
}

/// frames sent by the master to a node.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MasterFrame {
    /// the handshake was accepted.
    HelloOk {
        /// the node's identifier in the master's database.
        node_id: i64,
    },

    /// the handshake was rejected; the master closes the channel after
    /// sending this.
    HelloRejected {
        /// why registration was refused.
        reason: String,
    },

    /// a full configuration document for the node to apply.
    ///
    /// the document is always the complete desired state; nodes replace
    /// their running configuration with it and acknowledge.
    ConfigPush {
        /// identifies this push in the node's acknowledgment.
        push_id: u64,
        /// the compiled configuration document, verbatim.
        config: Box<RawValue>,
    },
}

/// per-client traffic counters inside a [`NodeFrame::Traffic`] report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientCounters {
    /// the client's email/identifier.
    pub email: String,
    /// upload bytes since the last report.
    pub up: i64,
    /// download bytes since the last report.
    pub down: i64,
}

impl NodeFrame {
    /// encode the frame as a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// decode a frame from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidFrame(e.to_string()))
    }
}

impl MasterFrame {
    /// encode the frame as a JSON string.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| Error::Serialization(e.to_string()))
    }

    /// decode a frame from JSON text.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| Error::InvalidFrame(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hello_round_trip() {
        let frame = NodeFrame::Hello {
            name: "edge-1".to_string(),
            secret: "s3cret".to_string(),
        };
        let json = frame.to_json().unwrap();
        match NodeFrame::from_json(&json).unwrap() {
            NodeFrame::Hello { name, secret } => {
                assert_eq!(name, "edge-1");
                assert_eq!(secret, "s3cret");
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn ack_reason_is_omitted_on_success() {
        let frame = NodeFrame::Ack {
            push_id: 7,
            applied: true,
            reason: None,
        };
        let json = frame.to_json().unwrap();
        assert!(!json.contains("reason"));

        // and carried on failure
        let frame = NodeFrame::Ack {
            push_id: 7,
            applied: false,
            reason: Some("engine rejected port".to_string()),
        };
        let json = frame.to_json().unwrap();
        match NodeFrame::from_json(&json).unwrap() {
            NodeFrame::Ack {
                applied, reason, ..
            } => {
                assert!(!applied);
                assert_eq!(reason.as_deref(), Some("engine rejected port"));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn config_push_carries_document_verbatim() {
        let doc = r#"{"inbounds":[{"tag":"in1","port":10000}],"outbounds":[],"routing":{"rules":[]}}"#;
        let frame = MasterFrame::ConfigPush {
            push_id: 1,
            config: RawValue::from_string(doc.to_string()).unwrap(),
        };
        let json = frame.to_json().unwrap();
        match MasterFrame::from_json(&json).unwrap() {
            MasterFrame::ConfigPush { push_id, config } => {
                assert_eq!(push_id, 1);
                assert_eq!(config.get(), doc);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn unknown_frame_is_an_error() {
        assert!(NodeFrame::from_json(r#"{"goodbye":{}}"#).is_err());
        assert!(MasterFrame::from_json("not json").is_err());
    }
}

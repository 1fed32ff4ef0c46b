//! compares expected and actually-running configuration documents.
//!
//! a read-only diagnostic: the detector reports divergence, it never
//! remediates. remediation is a re-push of the compiled document.

use std::collections::HashMap;

use serde_json::Value;

/// outbound tags the engine provides implicitly; their presence on a
/// node is never drift.
pub const BUILTIN_OUTBOUND_TAGS: &[&str] = &["direct", "block", "blackhole"];

/// structured divergence between expected and actual configuration.
///
/// tag equality is the join key; documents are compared structurally,
/// so reordering without content change is not drift.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigDrift {
    /// inbound tags present in expected, absent in actual.
    pub missing_inbounds: Vec<String>,
    /// inbound tags present in actual, absent in expected.
    pub extra_inbounds: Vec<String>,
    /// inbound tags present on both sides with field-level mismatches
    /// (populated only when verbose comparison is requested).
    pub mismatched_inbounds: Vec<String>,
    /// outbound tags present in expected, absent in actual.
    pub missing_outbounds: Vec<String>,
    /// outbound tags present in actual, absent in expected, excluding
    /// the engine's built-ins.
    pub extra_outbounds: Vec<String>,
    /// human-readable description of each finding, in detection order.
    pub details: Vec<String>,
}

impl ConfigDrift {
    /// whether the two documents agree completely.
    pub fn is_clean(&self) -> bool {
        self.missing_inbounds.is_empty()
            && self.extra_inbounds.is_empty()
            && self.mismatched_inbounds.is_empty()
            && self.missing_outbounds.is_empty()
            && self.extra_outbounds.is_empty()
    }

    /// whether the drift makes the node's config functionally wrong
    /// (missing listeners/routes or mismatched fields). extra entries
    /// alone are surplus, not breakage.
    pub fn needs_repush(&self) -> bool {
        !self.missing_inbounds.is_empty()
            || !self.missing_outbounds.is_empty()
            || !self.mismatched_inbounds.is_empty()
    }
}

/// compare an expected document (compiled, see [`crate::compile`])
/// against the node's actually-running one.
///
/// `verbose` additionally checks fields of inbounds present on both
/// sides (currently the listener port). both inputs are generic JSON
/// documents; missing or malformed sections are treated as empty.
pub fn detect_drift(expected: &Value, actual: &Value, verbose: bool) -> ConfigDrift {
    let mut drift = ConfigDrift::default();

    compare_inbounds(
        section(expected, "inbounds"),
        section(actual, "inbounds"),
        verbose,
        &mut drift,
    );
    compare_outbounds(section(expected, "outbounds"), section(actual, "outbounds"), &mut drift);

    drift
}

fn section<'a>(doc: &'a Value, key: &str) -> Vec<&'a Value> {
    doc.get(key)
        .and_then(Value::as_array)
        .map(|entries| entries.iter().collect())
        .unwrap_or_default()
}

fn tag_of(entry: &Value) -> Option<&str> {
    entry.get("tag").and_then(Value::as_str)
}

fn by_tag<'a>(entries: &[&'a Value]) -> HashMap<&'a str, &'a Value> {
    entries.iter().filter_map(|e| tag_of(e).map(|t| (t, *e))).collect()
}

fn compare_inbounds(
    expected: Vec<&Value>,
    actual: Vec<&Value>,
    verbose: bool,
    drift: &mut ConfigDrift,
) {
    let actual_tags = by_tag(&actual);
    let expected_tags = by_tag(&expected);

    for entry in &expected {
        let Some(tag) = tag_of(entry) else { continue };
        match actual_tags.get(tag) {
            None => {
                drift.missing_inbounds.push(tag.to_string());
                let port = entry.get("port").and_then(Value::as_i64).unwrap_or_default();
                let protocol = entry.get("protocol").and_then(Value::as_str).unwrap_or_default();
                drift.details.push(format!(
                    "inbound \"{tag}\" (port {port}, protocol {protocol}) not present on node"
                ));
            }
            Some(running) if verbose => {
                let expected_port = entry.get("port").and_then(Value::as_i64);
                let actual_port = running.get("port").and_then(Value::as_i64);
                if expected_port != actual_port {
                    drift.mismatched_inbounds.push(tag.to_string());
                    drift.details.push(format!(
                        "inbound \"{tag}\" port mismatch: expected {}, node runs {}",
                        display_port(expected_port),
                        display_port(actual_port),
                    ));
                }
            }
            Some(_) => {}
        }
    }

    for entry in &actual {
        let Some(tag) = tag_of(entry) else { continue };
        if !expected_tags.contains_key(tag) {
            drift.extra_inbounds.push(tag.to_string());
            drift
                .details
                .push(format!("inbound \"{tag}\" running on node but not expected"));
        }
    }
}

fn compare_outbounds(expected: Vec<&Value>, actual: Vec<&Value>, drift: &mut ConfigDrift) {
    let actual_tags = by_tag(&actual);
    let expected_tags = by_tag(&expected);

    for entry in &expected {
        let Some(tag) = tag_of(entry) else { continue };
        if !actual_tags.contains_key(tag) {
            drift.missing_outbounds.push(tag.to_string());
            drift
                .details
                .push(format!("outbound \"{tag}\" not present on node"));
        }
    }

    for entry in &actual {
        let Some(tag) = tag_of(entry) else { continue };
        if expected_tags.contains_key(tag) || BUILTIN_OUTBOUND_TAGS.contains(&tag) {
            continue;
        }
        drift.extra_outbounds.push(tag.to_string());
        drift
            .details
            .push(format!("outbound \"{tag}\" running on node but not expected"));
    }
}

fn display_port(port: Option<i64>) -> String {
    port.map_or_else(|| "(none)".to_string(), |p| p.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn missing_inbound_is_reported() {
        let expected = json!({
            "inbounds": [{"tag": "vmess-in", "port": 443, "protocol": "vmess"}],
            "outbounds": [],
        });
        let actual = json!({"inbounds": [], "outbounds": []});

        let drift = detect_drift(&expected, &actual, false);
        assert_eq!(drift.missing_inbounds, ["vmess-in"]);
        assert!(drift.needs_repush());
        assert!(drift.details[0].contains("443"));
    }

    #[test]
    fn builtin_extra_outbounds_are_not_drift() {
        let expected = json!({"inbounds": [], "outbounds": []});
        let actual = json!({
            "inbounds": [],
            "outbounds": [
                {"tag": "direct", "protocol": "freedom"},
                {"tag": "block", "protocol": "blackhole"},
                {"tag": "custom-out", "protocol": "vmess"},
            ],
        });

        let drift = detect_drift(&expected, &actual, false);
        assert_eq!(drift.extra_outbounds, ["custom-out"]);
        // surplus outbounds alone don't break the node
        assert!(!drift.needs_repush());
    }

    #[test]
    fn reordering_is_not_drift() {
        let expected = json!({
            "inbounds": [
                {"tag": "a", "port": 1, "protocol": "vmess"},
                {"tag": "b", "port": 2, "protocol": "vless"},
            ],
            "outbounds": [{"tag": "x", "protocol": "freedom"}],
        });
        let actual = json!({
            "inbounds": [
                {"tag": "b", "port": 2, "protocol": "vless"},
                {"tag": "a", "port": 1, "protocol": "vmess"},
            ],
            "outbounds": [{"tag": "x", "protocol": "freedom"}],
        });

        let drift = detect_drift(&expected, &actual, true);
        assert!(drift.is_clean(), "reorder reported as drift: {drift:?}");
    }

    #[test]
    fn verbose_reports_port_mismatch() {
        let expected = json!({"inbounds": [{"tag": "in1", "port": 443}]});
        let actual = json!({"inbounds": [{"tag": "in1", "port": 8443}]});

        // quiet comparison joins on tag only
        let drift = detect_drift(&expected, &actual, false);
        assert!(drift.is_clean());

        let drift = detect_drift(&expected, &actual, true);
        assert_eq!(drift.mismatched_inbounds, ["in1"]);
        assert!(drift.details[0].contains("expected 443"));
    }

    #[test]
    fn extra_inbound_is_reported() {
        let expected = json!({"inbounds": []});
        let actual = json!({"inbounds": [{"tag": "stray", "port": 9}]});

        let drift = detect_drift(&expected, &actual, false);
        assert_eq!(drift.extra_inbounds, ["stray"]);
        assert!(!drift.needs_repush());
    }

    #[test]
    fn missing_sections_are_treated_as_empty() {
        let drift = detect_drift(&json!({}), &json!({"routing": {"rules": []}}), true);
        assert!(drift.is_clean());
    }
}

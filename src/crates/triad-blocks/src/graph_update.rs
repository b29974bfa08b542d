//! `[GRAPH_UPDATE]` extraction.

use crate::grammar::{coerce_value, find_tag_blocks, split_key_value};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of mutation a `[GRAPH_UPDATE]` block describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    AddNode,
    UpdateNode,
    AddEdge,
    UpdateEdge,
}

impl UpdateKind {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "add_node" => Some(Self::AddNode),
            "update_node" => Some(Self::UpdateNode),
            "add_edge" => Some(Self::AddEdge),
            "update_edge" => Some(Self::UpdateEdge),
            _ => None,
        }
    }
}

/// One parsed `[GRAPH_UPDATE]` block. Fields beyond `kind` are kept in a
/// generic bag since each update kind has its own field schema and the
/// Knowledge Handler (not this crate) is the one that interprets them
/// against a specific graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphUpdate {
    pub kind: UpdateKind,
    pub fields: HashMap<String, serde_json::Value>,
}

impl GraphUpdate {
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }

    /// The `node_id` field, the identity quality gates key on.
    pub fn node_id(&self) -> Option<&str> {
        self.field_str("node_id")
    }

    pub fn confidence(&self) -> Option<f64> {
        self.fields.get("confidence").and_then(|v| {
            v.as_f64()
                .or_else(|| v.as_str().and_then(|s| s.parse::<f64>().ok()))
        })
    }
}

/// Extract every `[GRAPH_UPDATE]` block from `text`. A block with no
/// recognized `type` field is dropped (malformed, not fatal).
pub fn extract_graph_updates(text: &str) -> Vec<GraphUpdate> {
    find_tag_blocks(text, "GRAPH_UPDATE")
        .into_iter()
        .filter_map(|body| parse_one(&body))
        .collect()
}

fn parse_one(body: &str) -> Option<GraphUpdate> {
    let mut fields = HashMap::new();
    let mut kind = None;

    for line in body.trim().lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = split_key_value(line) else {
            continue;
        };
        if key == "type" {
            kind = UpdateKind::parse(&value);
            continue;
        }
        let coerced = if key == "confidence" {
            value
                .parse::<f64>()
                .map(|f| serde_json::json!(f))
                .unwrap_or_else(|_| coerce_value(&value))
        } else {
            coerce_value(&value)
        };
        fields.insert(key, coerced);
    }

    kind.map(|kind| GraphUpdate { kind, fields })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_add_node() {
        let text = "[GRAPH_UPDATE]\ntype: add_node\nnode_id: node_001\nnode_type: Entity\nlabel: Example\nconfidence: 0.95\n[/GRAPH_UPDATE]";
        let updates = extract_graph_updates(text);
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].kind, UpdateKind::AddNode);
        assert_eq!(updates[0].node_id(), Some("node_001"));
        assert_eq!(updates[0].confidence(), Some(0.95));
    }

    #[test]
    fn test_unrecognized_type_is_dropped() {
        let text = "[GRAPH_UPDATE]\ntype: delete_everything\nnode_id: x\n[/GRAPH_UPDATE]";
        assert!(extract_graph_updates(text).is_empty());
    }

    #[test]
    fn test_missing_type_is_dropped() {
        let text = "[GRAPH_UPDATE]\nnode_id: x\n[/GRAPH_UPDATE]";
        assert!(extract_graph_updates(text).is_empty());
    }

    #[test]
    fn test_json_array_field_parsed() {
        let text = "[GRAPH_UPDATE]\ntype: add_node\nnode_id: n1\nevidence: [\"a\", \"b\"]\n[/GRAPH_UPDATE]";
        let updates = extract_graph_updates(text);
        assert_eq!(updates[0].fields["evidence"], serde_json::json!(["a", "b"]));
    }

    #[test]
    fn test_multiple_updates_and_empty_text() {
        assert!(extract_graph_updates("").is_empty());
        let text = "[GRAPH_UPDATE]\ntype: add_node\nnode_id: a\n[/GRAPH_UPDATE]\n[GRAPH_UPDATE]\ntype: add_edge\nsource: a\ntarget: b\nkey: relates_to\n[/GRAPH_UPDATE]";
        let updates = extract_graph_updates(text);
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[1].kind, UpdateKind::AddEdge);
    }
}

//! Best-effort repair of a possibly-corrupted on-disk graph.
//!
//! Operates on raw JSON rather than a parsed [`Graph`] because the whole
//! point is to recover from individual nodes/links that fail to deserialize
//! (missing required fields) without losing everything else in the file.

use crate::model::{Graph, GraphMeta, Link, Node};
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Actions repair took, for logging/auditing.
#[derive(Debug, Clone, Serialize)]
pub struct RepairResult {
    pub actions: Vec<String>,
    pub nodes_dropped: usize,
    pub edges_dropped: usize,
}

/// Repair a raw JSON value into a valid [`Graph`], dropping whatever can't
/// be salvaged. Idempotent: repairing an already-repaired graph takes no
/// further actions.
pub fn repair_value(triad_name: &str, raw: &Value) -> (Graph, RepairResult) {
    let mut actions = Vec::new();
    let mut nodes_dropped = 0;
    let mut edges_dropped = 0;

    let directed = raw.get("directed").and_then(Value::as_bool).unwrap_or(true);

    let mut nodes: Vec<Node> = Vec::new();
    let mut seen_node_ids = HashSet::new();
    if let Some(arr) = raw.get("nodes").and_then(Value::as_array) {
        for item in arr {
            match serde_json::from_value::<Node>(item.clone()) {
                Ok(mut node) => {
                    if !(0.0..=1.0).contains(&node.confidence) {
                        actions.push(format!(
                            "clamped node {} confidence {} into [0, 1]",
                            node.id, node.confidence
                        ));
                        node.confidence = node.confidence.clamp(0.0, 1.0);
                    }
                    if seen_node_ids.insert(node.id.clone()) {
                        nodes.push(node);
                    } else {
                        nodes_dropped += 1;
                        actions.push(format!("dropped duplicate node id {}", node.id));
                    }
                }
                Err(e) => {
                    nodes_dropped += 1;
                    actions.push(format!("dropped node missing required fields: {e}"));
                }
            }
        }
    }

    let node_ids: HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
    let mut links: Vec<Link> = Vec::new();
    let mut seen_links = HashSet::new();
    if let Some(arr) = raw.get("links").and_then(Value::as_array) {
        for item in arr {
            match serde_json::from_value::<Link>(item.clone()) {
                Ok(link) => {
                    if !node_ids.contains(link.source.as_str())
                        || !node_ids.contains(link.target.as_str())
                    {
                        edges_dropped += 1;
                        actions.push(format!(
                            "dropped edge with unresolved endpoint: {} -> {} ({})",
                            link.source, link.target, link.key
                        ));
                        continue;
                    }
                    let identity = (link.source.clone(), link.target.clone(), link.key.clone());
                    if seen_links.insert(identity) {
                        links.push(link);
                    } else {
                        edges_dropped += 1;
                        actions.push(format!(
                            "dropped duplicate edge: {} -> {} ({})",
                            link.source, link.target, link.key
                        ));
                    }
                }
                Err(e) => {
                    edges_dropped += 1;
                    actions.push(format!("dropped edge missing required fields: {e}"));
                }
            }
        }
    }

    let now = Utc::now();
    let created_at = raw
        .get("_meta")
        .and_then(|m| m.get("created_at"))
        .and_then(Value::as_str)
        .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(now);

    let node_count = nodes.len();
    let edge_count = links.len();
    let graph = Graph {
        directed,
        nodes,
        links,
        meta: GraphMeta {
            triad_name: triad_name.to_string(),
            created_at,
            updated_at: now,
            node_count,
            edge_count,
        },
    };

    (
        graph,
        RepairResult {
            actions,
            nodes_dropped,
            edges_dropped,
        },
    )
}

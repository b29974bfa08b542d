//! Schema and invariant validation, run before every write.

use crate::model::Graph;
use serde::Serialize;
use std::collections::HashSet;

/// One violated invariant, with enough detail to locate the offending node
/// or edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub kind: String,
    pub detail: String,
}

impl Violation {
    fn new(kind: &str, detail: impl Into<String>) -> Self {
        Self {
            kind: kind.to_string(),
            detail: detail.into(),
        }
    }
}

/// The result of checking a graph's invariants. `valid` is `violations.is_empty()`.
#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

/// Validate a graph's invariants: required fields, confidence bounds, edge
/// endpoint resolution, and `_meta` counter consistency.
///
/// Node `id`/`type`/`label` are required by the Rust type itself (they are
/// non-`Option` fields), so the only runtime checks left are the ones the
/// type system can't express: value ranges, cross-references, and derived
/// counters.
pub fn validate(graph: &Graph) -> ValidationResult {
    let mut violations = Vec::new();

    if graph.meta.node_count != graph.nodes.len() {
        violations.push(Violation::new(
            "meta_mismatch",
            format!(
                "_meta.node_count={} but nodes.len()={}",
                graph.meta.node_count,
                graph.nodes.len()
            ),
        ));
    }
    if graph.meta.edge_count != graph.links.len() {
        violations.push(Violation::new(
            "meta_mismatch",
            format!(
                "_meta.edge_count={} but links.len()={}",
                graph.meta.edge_count,
                graph.links.len()
            ),
        ));
    }

    let mut seen_ids = HashSet::new();
    for node in &graph.nodes {
        if !(0.0..=1.0).contains(&node.confidence) {
            violations.push(Violation::new(
                "confidence_out_of_range",
                format!("node {} has confidence {}", node.id, node.confidence),
            ));
        }
        if !seen_ids.insert(node.id.as_str()) {
            violations.push(Violation::new(
                "duplicate_node_id",
                node.id.clone(),
            ));
        }
    }

    let node_ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut seen_links = HashSet::new();
    for link in &graph.links {
        if !node_ids.contains(link.source.as_str()) {
            violations.push(Violation::new(
                "dangling_edge_source",
                format!("{} -> {} ({})", link.source, link.target, link.key),
            ));
        }
        if !node_ids.contains(link.target.as_str()) {
            violations.push(Violation::new(
                "dangling_edge_target",
                format!("{} -> {} ({})", link.source, link.target, link.key),
            ));
        }
        if !seen_links.insert(link.identity()) {
            violations.push(Violation::new(
                "duplicate_edge",
                format!("{} -> {} ({})", link.source, link.target, link.key),
            ));
        }
    }

    let valid = violations.is_empty();
    ValidationResult { valid, violations }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphMeta, Link, Node, NodeType};
    use chrono::Utc;
    use std::collections::HashMap;

    fn node(id: &str, confidence: f64) -> Node {
        Node {
            id: id.to_string(),
            node_type: NodeType::Finding,
            label: "x".into(),
            description: String::new(),
            confidence,
            evidence: vec![],
            created_by: "agent".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            updated_by: None,
            priority: None,
            status: None,
            process_knowledge: None,
            extra: HashMap::new(),
        }
    }

    fn link(source: &str, target: &str, key: &str) -> Link {
        Link {
            source: source.into(),
            target: target.into(),
            key: key.into(),
            rationale: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            extra: HashMap::new(),
        }
    }

    fn graph_with(nodes: Vec<Node>, links: Vec<Link>) -> Graph {
        let now = Utc::now();
        Graph {
            directed: true,
            meta: GraphMeta {
                triad_name: "test".into(),
                created_at: now,
                updated_at: now,
                node_count: nodes.len(),
                edge_count: links.len(),
            },
            nodes,
            links,
        }
    }

    #[test]
    fn test_valid_graph_passes() {
        let g = graph_with(vec![node("a", 0.5), node("b", 0.9)], vec![link("a", "b", "relates_to")]);
        let result = validate(&g);
        assert!(result.valid, "{:?}", result.violations);
    }

    #[test]
    fn test_dangling_edge_detected() {
        let g = graph_with(vec![node("a", 0.5)], vec![link("a", "ghost", "relates_to")]);
        let result = validate(&g);
        assert!(!result.valid);
        assert!(result.violations.iter().any(|v| v.kind == "dangling_edge_target"));
    }

    #[test]
    fn test_confidence_out_of_range_detected() {
        let g = graph_with(vec![node("a", 1.5)], vec![]);
        let result = validate(&g);
        assert!(result.violations.iter().any(|v| v.kind == "confidence_out_of_range"));
    }

    #[test]
    fn test_meta_mismatch_detected() {
        let mut g = graph_with(vec![node("a", 0.5)], vec![]);
        g.meta.node_count = 99;
        let result = validate(&g);
        assert!(result.violations.iter().any(|v| v.kind == "meta_mismatch"));
    }

    #[test]
    fn test_duplicate_node_id_detected() {
        let g = graph_with(vec![node("a", 0.5), node("a", 0.6)], vec![]);
        let result = validate(&g);
        assert!(result.violations.iter().any(|v| v.kind == "duplicate_node_id"));
    }

    #[test]
    fn test_duplicate_edge_detected() {
        let g = graph_with(
            vec![node("a", 0.5), node("b", 0.5)],
            vec![link("a", "b", "relates_to"), link("a", "b", "relates_to")],
        );
        let result = validate(&g);
        assert!(result.violations.iter().any(|v| v.kind == "duplicate_edge"));
    }

    #[test]
    fn test_confidence_boundary_values_are_valid() {
        let g = graph_with(vec![node("a", 0.0), node("b", 1.0)], vec![]);
        let result = validate(&g);
        assert!(result.valid);
    }
}

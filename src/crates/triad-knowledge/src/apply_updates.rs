//! Apply-updates: turn `[GRAPH_UPDATE]`/`[PRE_FLIGHT_CHECK]` blocks parsed
//! from conversation text into mutations against per-triad graphs.
//!
//! The quality gate reports violations; it never refuses to apply an
//! update. A missing or failing pre-flight check is a signal for a human
//! or a later audit, not a reason to drop knowledge on the floor.

use crate::error::Result;
use crate::lessons::extract_lessons;
use serde::Serialize;
use std::collections::HashMap;
use triad_blocks::{extract_graph_updates, extract_pre_flight_checks, GraphUpdate, PreFlightCheck, UpdateKind};
use triad_graph::{GraphStore, Link, Node, NodeType};
use triad_support::time::now;

/// One quality-gate finding against a single `[GRAPH_UPDATE]` block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityViolation {
    pub node_id: String,
    pub reason: String,
}

/// What happened to a single update once grouped and applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum ApplyOutcome {
    NodeAdded { id: String },
    NodeUpdated { id: String },
    NodeSkippedExists { id: String },
    NodeSkippedMissing { id: String },
    EdgeAdded { source: String, target: String, key: String },
    EdgeUpdated { source: String, target: String, key: String },
    EdgeSkippedExists { source: String, target: String, key: String },
    EdgeSkippedMissing { source: String, target: String, key: String },
}

#[derive(Debug, Default, Serialize)]
pub struct ApplyUpdatesReport {
    pub violations: Vec<QualityViolation>,
    pub outcomes: Vec<ApplyOutcome>,
    pub triads_touched: Vec<String>,
    /// Ids of `ProcessKnowledge` nodes extract-lessons found in the same
    /// text and persisted into `router.default_triad()`'s graph.
    pub lessons_added: Vec<String>,
}

/// Chooses the triad an update belongs to, in preference order:
/// explicit `triad` field, `created_by` agent lookup, node-id prefix
/// convention, then a default.
pub trait TriadRouter {
    fn triad_for_agent(&self, agent: &str) -> Option<String>;
    fn default_triad(&self) -> String;
}

/// A router with no agent registry: every update falls through to the
/// node-id prefix convention or the configured default.
pub struct DefaultTriadRouter {
    pub default: String,
}

impl TriadRouter for DefaultTriadRouter {
    fn triad_for_agent(&self, _agent: &str) -> Option<String> {
        None
    }

    fn default_triad(&self) -> String {
        self.default.clone()
    }
}

fn triad_for_update(update: &GraphUpdate, router: &dyn TriadRouter) -> String {
    if let Some(explicit) = update.field_str("triad") {
        return explicit.to_string();
    }
    if let Some(agent) = update.field_str("created_by") {
        if let Some(triad) = router.triad_for_agent(agent) {
            return triad;
        }
    }
    if let Some(node_id) = update.node_id() {
        if let Some((prefix, _rest)) = node_id.split_once('_') {
            if !prefix.is_empty() {
                return prefix.to_string();
            }
        }
    }
    router.default_triad()
}

/// Checklist items every `[PRE_FLIGHT_CHECK]` is expected to cover before
/// its `[GRAPH_UPDATE]` is trusted.
const REQUIRED_CHECKLIST_ITEMS: &[&str] =
    &["property_count", "confidence_check", "evidence_quality", "assumptions_handled", "node_type_correct"];

/// Checks one `[GRAPH_UPDATE]` block against its matching `[PRE_FLIGHT_CHECK]`
/// (matched by `node_id`). Returns one violation per distinct problem found;
/// an empty vec means the update passes cleanly.
fn quality_check(update: &GraphUpdate, checks: &HashMap<&str, &PreFlightCheck>) -> Vec<QualityViolation> {
    let Some(node_id) = update.node_id() else {
        return Vec::new();
    };

    let Some(check) = checks.get(node_id) else {
        return vec![QualityViolation {
            node_id: node_id.to_string(),
            reason: "no matching pre-flight check".to_string(),
        }];
    };

    let mut violations = Vec::new();
    let passed = check.verification_passed();

    if !passed {
        violations.push(QualityViolation {
            node_id: node_id.to_string(),
            reason: "pre-flight check verification_status is not PASSED".to_string(),
        });
    }

    for required in REQUIRED_CHECKLIST_ITEMS {
        if !check.checklist_items.contains_key(*required) {
            violations.push(QualityViolation {
                node_id: node_id.to_string(),
                reason: format!("pre-flight check missing checklist item: {}", required),
            });
        }
    }

    if passed {
        let failed: Vec<&str> = check
            .checklist_items
            .iter()
            .filter(|(_, item)| item.status == triad_blocks::ChecklistStatus::Fail)
            .map(|(name, _)| name.as_str())
            .collect();
        if !failed.is_empty() {
            violations.push(QualityViolation {
                node_id: node_id.to_string(),
                reason: format!(
                    "verification_status claims PASSED but checklist item(s) failed: {}",
                    failed.join(", ")
                ),
            });
        }
    }

    violations
}

/// Extracts updates and pre-flight checks from `text`, runs the quality
/// gate, groups updates by triad, and applies each group to its graph.
pub fn apply_updates(
    store: &GraphStore,
    text: &str,
    router: &dyn TriadRouter,
    actor: &str,
) -> Result<ApplyUpdatesReport> {
    let updates = extract_graph_updates(text);
    let checks = extract_pre_flight_checks(text);
    let checks_by_node: HashMap<&str, &PreFlightCheck> = checks
        .iter()
        .filter_map(|c| c.node_id().map(|id| (id, c)))
        .collect();

    let mut report = ApplyUpdatesReport::default();
    for update in &updates {
        report.violations.extend(quality_check(update, &checks_by_node));
    }

    let mut grouped: Vec<(String, Vec<&GraphUpdate>)> = Vec::new();
    for update in &updates {
        let triad = triad_for_update(update, router);
        match grouped.iter_mut().find(|(t, _)| t == &triad) {
            Some((_, items)) => items.push(update),
            None => grouped.push((triad, vec![update])),
        }
    }

    for (triad, items) in grouped {
        let mut graph = store.load(&triad, false)?;
        for update in items {
            let outcome = apply_one(&mut graph, update, actor);
            report.outcomes.push(outcome);
        }
        store.save(&triad, &mut graph)?;
        report.triads_touched.push(triad);
    }

    let lesson_triad = router.default_triad();
    let lessons = extract_lessons(text, actor, Some(lesson_triad.as_str()));
    if !lessons.is_empty() {
        let mut graph = store.load(&lesson_triad, false)?;
        for node in lessons {
            report.lessons_added.push(node.id.clone());
            graph.nodes.push(node);
        }
        store.save(&lesson_triad, &mut graph)?;
        if !report.triads_touched.contains(&lesson_triad) {
            report.triads_touched.push(lesson_triad);
        }
    }

    Ok(report)
}

fn apply_one(graph: &mut triad_graph::Graph, update: &GraphUpdate, actor: &str) -> ApplyOutcome {
    match update.kind {
        UpdateKind::AddNode => apply_add_node(graph, update, actor),
        UpdateKind::UpdateNode => apply_update_node(graph, update, actor),
        UpdateKind::AddEdge => apply_add_edge(graph, update),
        UpdateKind::UpdateEdge => apply_update_edge(graph, update),
    }
}

fn apply_add_node(graph: &mut triad_graph::Graph, update: &GraphUpdate, actor: &str) -> ApplyOutcome {
    let id = update.node_id().unwrap_or_default().to_string();
    if graph.find_node(&id).is_some() {
        return ApplyOutcome::NodeSkippedExists { id };
    }

    let node_type = update
        .field_str("node_type")
        .or_else(|| update.field_str("type"))
        .and_then(parse_node_type)
        .unwrap_or(NodeType::Entity);
    let label = update.field_str("label").unwrap_or(&id).to_string();
    let now = now();

    let node = Node {
        id: id.clone(),
        node_type,
        label,
        description: update.field_str("description").unwrap_or_default().to_string(),
        confidence: update.confidence().unwrap_or(0.5),
        evidence: update
            .fields
            .get("evidence")
            .and_then(|v| v.as_array())
            .map(|a| a.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default(),
        created_by: actor.to_string(),
        created_at: now,
        updated_at: now,
        updated_by: None,
        priority: None,
        status: None,
        process_knowledge: None,
        extra: Default::default(),
    };
    graph.nodes.push(node);
    ApplyOutcome::NodeAdded { id }
}

fn apply_update_node(graph: &mut triad_graph::Graph, update: &GraphUpdate, actor: &str) -> ApplyOutcome {
    let id = update.node_id().unwrap_or_default().to_string();
    let Some(node) = graph.find_node_mut(&id) else {
        return ApplyOutcome::NodeSkippedMissing { id };
    };

    for (key, value) in &update.fields {
        if key == "type" || key == "node_id" {
            continue;
        }
        match key.as_str() {
            "label" => {
                if let Some(s) = value.as_str() {
                    node.label = s.to_string();
                }
            }
            "description" => {
                if let Some(s) = value.as_str() {
                    node.description = s.to_string();
                }
            }
            "confidence" => {
                if let Some(f) = value.as_f64() {
                    node.confidence = f;
                }
            }
            _ => {
                node.extra.insert(key.clone(), value.clone());
            }
        }
    }
    node.updated_by = Some(actor.to_string());
    node.updated_at = now();
    ApplyOutcome::NodeUpdated { id }
}

fn apply_add_edge(graph: &mut triad_graph::Graph, update: &GraphUpdate) -> ApplyOutcome {
    let source = update.field_str("source").unwrap_or_default().to_string();
    let target = update.field_str("target").unwrap_or_default().to_string();
    let key = update.field_str("key").unwrap_or("relates_to").to_string();

    if graph.find_link(&source, &target, &key).is_some() {
        return ApplyOutcome::EdgeSkippedExists { source, target, key };
    }

    let now = now();
    let link = Link {
        source: source.clone(),
        target: target.clone(),
        key: key.clone(),
        rationale: update.field_str("rationale").unwrap_or_default().to_string(),
        created_at: now,
        updated_at: now,
        extra: Default::default(),
    };
    graph.links.push(link);
    ApplyOutcome::EdgeAdded { source, target, key }
}

fn apply_update_edge(graph: &mut triad_graph::Graph, update: &GraphUpdate) -> ApplyOutcome {
    let source = update.field_str("source").unwrap_or_default().to_string();
    let target = update.field_str("target").unwrap_or_default().to_string();
    let key = update.field_str("key").unwrap_or("relates_to").to_string();

    let Some(link) = graph.find_link_mut(&source, &target, &key) else {
        return ApplyOutcome::EdgeSkippedMissing { source, target, key };
    };

    if let Some(rationale) = update.field_str("rationale") {
        link.rationale = rationale.to_string();
    }
    for (field_key, value) in &update.fields {
        if matches!(field_key.as_str(), "source" | "target" | "key" | "type" | "rationale") {
            continue;
        }
        link.extra.insert(field_key.clone(), value.clone());
    }
    link.updated_at = now();
    ApplyOutcome::EdgeUpdated { source, target, key }
}

fn parse_node_type(raw: &str) -> Option<NodeType> {
    match raw.to_ascii_lowercase().as_str() {
        "entity" => Some(NodeType::Entity),
        "finding" => Some(NodeType::Finding),
        "concept" => Some(NodeType::Concept),
        "uncertainty" => Some(NodeType::Uncertainty),
        "decision" => Some(NodeType::Decision),
        _ => None,
    }
}

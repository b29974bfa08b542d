//! Graph data model: nodes, links, metadata, and the ProcessKnowledge
//! extension carried by some nodes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The kind of thing a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum NodeType {
    Entity,
    Finding,
    Concept,
    Uncertainty,
    Decision,
}

/// Node priority, used by both knowledge extraction and the pre-tool hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

/// Lifecycle status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Active,
    NeedsValidation,
    Deprecated,
}

/// The category of a ProcessKnowledge node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessType {
    Checklist,
    Pattern,
    Warning,
    Requirement,
}

/// Which tool calls a ProcessKnowledge node is relevant to. Empty lists are
/// wildcard-none: they never match, rather than matching everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerConditions {
    #[serde(default)]
    pub tool_names: Vec<String>,
    #[serde(default)]
    pub file_patterns: Vec<String>,
    #[serde(default)]
    pub action_keywords: Vec<String>,
    #[serde(default)]
    pub context_keywords: Vec<String>,
    #[serde(default)]
    pub triad_names: Vec<String>,
}

impl TriggerConditions {
    /// Whether any of this node's trigger lists overlaps the given call
    /// context. Empty lists never match.
    pub fn matches(
        &self,
        tool_name: Option<&str>,
        file_path: Option<&str>,
        action_keywords: &[String],
        context_keywords: &[String],
        triad_name: Option<&str>,
    ) -> bool {
        if let Some(tool) = tool_name {
            if self.tool_names.iter().any(|t| t == tool) {
                return true;
            }
        }
        if let Some(path) = file_path {
            if self
                .file_patterns
                .iter()
                .any(|pat| glob_match(pat, path))
            {
                return true;
            }
        }
        if self
            .action_keywords
            .iter()
            .any(|kw| action_keywords.iter().any(|a| a.eq_ignore_ascii_case(kw)))
        {
            return true;
        }
        if self
            .context_keywords
            .iter()
            .any(|kw| context_keywords.iter().any(|c| c.eq_ignore_ascii_case(kw)))
        {
            return true;
        }
        if let Some(triad) = triad_name {
            if self.triad_names.iter().any(|t| t == triad) {
                return true;
            }
        }
        false
    }
}

/// Minimal glob matcher supporting a leading/trailing `*` (sufficient for
/// version-file patterns like `*/VERSION` or `Cargo.toml`).
pub fn glob_match(pattern: &str, value: &str) -> bool {
    if pattern == value {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix('*') {
        return value.ends_with(suffix);
    }
    if let Some(prefix) = pattern.strip_suffix('*') {
        return value.starts_with(prefix);
    }
    false
}

/// A single checklist line inside a checklist-type ProcessKnowledge node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItem {
    pub item: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// A single outcome observation for a ProcessKnowledge node (confirmation,
/// contradiction, injection, etc), appended to `outcome_history`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeEvent {
    pub kind: String,
    pub at: DateTime<Utc>,
}

/// Extension data present only on ProcessKnowledge nodes
/// (`node.type == Concept`, `process_knowledge.is_some()`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessKnowledge {
    pub process_type: ProcessType,
    #[serde(default)]
    pub trigger_conditions: TriggerConditions,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub checklist: Vec<ChecklistItem>,
    #[serde(default)]
    pub success_count: u64,
    #[serde(default)]
    pub failure_count: u64,
    #[serde(default)]
    pub confirmation_count: u64,
    #[serde(default)]
    pub contradiction_count: u64,
    #[serde(default)]
    pub injection_count: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outcome_history: Vec<OutcomeEvent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deprecated_reason: Option<String>,
}

/// A graph node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub label: String,
    #[serde(default)]
    pub description: String,
    pub confidence: f64,
    #[serde(default)]
    pub evidence: Vec<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<NodeStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_knowledge: Option<ProcessKnowledge>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// A directed edge between two node ids.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub key: String,
    #[serde(default)]
    pub rationale: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Link {
    /// The `(source, target, key)` identity triple links are deduplicated on.
    pub fn identity(&self) -> (&str, &str, &str) {
        (&self.source, &self.target, &self.key)
    }
}

/// Graph-level metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphMeta {
    pub triad_name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub node_count: usize,
    pub edge_count: usize,
}

/// A per-triad knowledge graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub directed: bool,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
    #[serde(rename = "_meta")]
    pub meta: GraphMeta,
}

impl Graph {
    /// A fresh, empty graph for `triad_name`. Never written to disk by
    /// `load` on its own; callers get it back in memory on a missing file.
    pub fn empty(triad_name: impl Into<String>) -> Self {
        let now = Utc::now();
        let triad_name = triad_name.into();
        Self {
            directed: true,
            nodes: Vec::new(),
            links: Vec::new(),
            meta: GraphMeta {
                triad_name,
                created_at: now,
                updated_at: now,
                node_count: 0,
                edge_count: 0,
            },
        }
    }

    /// Recompute `_meta` node/edge counts and bump `updated_at`. Called
    /// right before every save.
    pub fn sync_meta(&mut self) {
        self.meta.node_count = self.nodes.len();
        self.meta.edge_count = self.links.len();
        self.meta.updated_at = Utc::now();
    }

    pub fn find_node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn find_node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn find_link(&self, source: &str, target: &str, key: &str) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.identity() == (source, target, key))
    }

    pub fn find_link_mut(&mut self, source: &str, target: &str, key: &str) -> Option<&mut Link> {
        self.links
            .iter_mut()
            .find(|l| l.identity() == (source, target, key))
    }
}

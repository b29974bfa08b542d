//! Workflow schema: the ordered triads a workflow type runs through, plus
//! its enforcement defaults and conditional gates.

use crate::error::{Result, WorkflowError};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// One triad as it appears in a workflow schema.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriadDefinition {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub triad_type: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

fn default_required() -> bool {
    true
}

/// How strictly out-of-order transitions are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnforcementMode {
    Strict,
    Recommended,
    Optional,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnforcementConfig {
    pub mode: EnforcementMode,
    #[serde(default)]
    pub per_triad_overrides: HashMap<String, EnforcementMode>,
}

/// Ordinal complexity level used by `complexity` conditional-requirement
/// gates. Ordered `Minimal < Moderate < Substantial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityLevel {
    Minimal,
    Moderate,
    Substantial,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentCreatedThreshold {
    pub threshold: f64,
    pub units: String,
}

/// The metrics a conditional requirement's condition is evaluated against.
/// Every field is optional; only the fields present in the schema's
/// `condition.metrics` block are checked.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionMetrics {
    #[serde(default)]
    pub content_created: Option<ContentCreatedThreshold>,
    #[serde(default)]
    pub components_modified: Option<u32>,
    #[serde(default)]
    pub complexity: Option<ComplexityLevel>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "type")]
    pub condition_type: String,
    pub metrics: ConditionMetrics,
}

/// A rule a workflow schema applies when validating a transition.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule_type", rename_all = "snake_case")]
pub enum WorkflowRule {
    SequentialProgression {
        #[serde(default = "default_track_deviations")]
        track_deviations: bool,
    },
    ConditionalRequirement {
        gate_triad: String,
        before_triad: String,
        condition: Condition,
        #[serde(default)]
        bypass_allowed: bool,
    },
}

fn default_track_deviations() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSchema {
    pub workflow_name: String,
    pub version: String,
    pub triads: Vec<TriadDefinition>,
    pub enforcement: EnforcementConfig,
    #[serde(default)]
    pub workflow_rules: Vec<WorkflowRule>,
}

impl WorkflowSchema {
    /// Position of `triad_id` in schema order, if present.
    pub fn index_of(&self, triad_id: &str) -> Option<usize> {
        self.triads.iter().position(|t| t.id == triad_id)
    }

    pub fn triad(&self, triad_id: &str) -> Option<&TriadDefinition> {
        self.triads.iter().find(|t| t.id == triad_id)
    }

    /// Effective enforcement mode for `triad_id`: its per-triad override, or
    /// the schema default.
    pub fn enforcement_mode_for(&self, triad_id: &str) -> EnforcementMode {
        self.enforcement
            .per_triad_overrides
            .get(triad_id)
            .copied()
            .unwrap_or(self.enforcement.mode)
    }

    /// Reject schemas with duplicate triad ids or rules referencing
    /// triads the schema doesn't define.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for triad in &self.triads {
            if !seen.insert(triad.id.as_str()) {
                return Err(WorkflowError::Schema(format!(
                    "duplicate triad id: {}",
                    triad.id
                )));
            }
        }

        for rule in &self.workflow_rules {
            if let WorkflowRule::ConditionalRequirement {
                gate_triad,
                before_triad,
                ..
            } = rule
            {
                if self.index_of(gate_triad).is_none() {
                    return Err(WorkflowError::Schema(format!(
                        "conditional_requirement references unknown gate_triad: {gate_triad}"
                    )));
                }
                if self.index_of(before_triad).is_none() {
                    return Err(WorkflowError::Schema(format!(
                        "conditional_requirement references unknown before_triad: {before_triad}"
                    )));
                }
            }
        }

        for override_triad in self.enforcement.per_triad_overrides.keys() {
            if self.index_of(override_triad).is_none() {
                return Err(WorkflowError::Schema(format!(
                    "per_triad_overrides references unknown triad: {override_triad}"
                )));
            }
        }

        Ok(())
    }
}

/// Parse and validate a schema from its JSON or YAML text representation.
pub fn load_schema_str(text: &str, is_yaml: bool) -> Result<WorkflowSchema> {
    let schema: WorkflowSchema = if is_yaml {
        serde_yaml::from_str(text).map_err(|e| WorkflowError::Schema(e.to_string()))?
    } else {
        serde_json::from_str(text).map_err(|e| WorkflowError::Schema(e.to_string()))?
    };
    schema.validate()?;
    Ok(schema)
}

//! Transition validation: sequential progression, backward-move warnings,
//! and conditional significance gates.

use crate::instance::WorkflowInstance;
use crate::schema::{ComplexityLevel, EnforcementMode, WorkflowRule, WorkflowSchema};

/// Runtime metrics describing the work done in the current transition,
/// evaluated against a schema's `conditional_requirement` thresholds.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    pub content_created: Option<ContentCreated>,
    pub components_modified: Option<u32>,
    pub complexity: Option<ComplexityLevel>,
}

#[derive(Debug, Clone)]
pub struct ContentCreated {
    pub quantity: f64,
    pub units: String,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<String>,
    pub warnings: Vec<String>,
    pub skipped_triads: Vec<String>,
    pub required_triad: Option<String>,
    pub enforcement_mode: EnforcementMode,
}

/// Checks a requested transition against a workflow schema and an
/// instance's progress. Takes a `triad_exists` callback rather than a
/// concrete filesystem-discovery type, so callers can stub it in tests.
pub struct Validator<'a> {
    schema: &'a WorkflowSchema,
}

impl<'a> Validator<'a> {
    pub fn new(schema: &'a WorkflowSchema) -> Self {
        Self { schema }
    }

    pub fn validate_transition(
        &self,
        instance: &WorkflowInstance,
        requested_triad: &str,
        triad_exists: &dyn Fn(&str) -> bool,
        metrics: Option<&Metrics>,
    ) -> ValidationResult {
        let mut violations = Vec::new();
        let mut warnings = Vec::new();
        let mut skipped_triads = Vec::new();
        let mut required_triad = None;

        let enforcement_mode = self.schema.enforcement_mode_for(requested_triad);

        let Some(requested_index) = self.schema.index_of(requested_triad) else {
            violations.push(format!(
                "requested triad '{requested_triad}' not found in workflow schema"
            ));
            return ValidationResult {
                valid: false,
                violations,
                warnings,
                skipped_triads,
                required_triad,
                enforcement_mode,
            };
        };

        if !triad_exists(requested_triad) {
            violations.push(format!(
                "requested triad '{requested_triad}' not found in .claude/agents/"
            ));
        }

        let completed_ids: Vec<&str> = instance
            .workflow_progress
            .completed_triads
            .iter()
            .map(|c| c.triad_id.as_str())
            .collect();

        let latest_completed_index = completed_ids
            .iter()
            .filter_map(|id| self.schema.index_of(id))
            .max();

        match latest_completed_index {
            Some(latest) if requested_index < latest => {
                warnings.push(format!(
                    "backward movement: moving from index {latest} to {requested_index} ('{requested_triad}')"
                ));
            }
            _ => {
                let start = latest_completed_index.map(|i| i + 1).unwrap_or(0);
                for (index, triad) in self.schema.triads.iter().enumerate() {
                    if index < start || index >= requested_index {
                        continue;
                    }
                    if !triad.required {
                        continue;
                    }
                    if completed_ids.contains(&triad.id.as_str()) {
                        continue;
                    }
                    skipped_triads.push(triad.id.clone());
                }
                if !skipped_triads.is_empty() {
                    warnings.push(format!(
                        "skipping required triad(s) before '{requested_triad}': {}",
                        skipped_triads.join(", ")
                    ));
                }
            }
        }

        for rule in &self.schema.workflow_rules {
            if let WorkflowRule::ConditionalRequirement {
                gate_triad,
                before_triad,
                condition,
                ..
            } = rule
            {
                if before_triad != requested_triad {
                    continue;
                }
                let gate_completed = completed_ids.contains(&gate_triad.as_str());
                if gate_completed {
                    continue;
                }
                let triggered = metrics
                    .map(|m| condition_triggered(condition, m))
                    .unwrap_or(false);
                if triggered {
                    required_triad = Some(gate_triad.clone());
                    violations.push(format!(
                        "'{gate_triad}' is required before '{before_triad}' given the significance of this work"
                    ));
                }
            }
        }

        ValidationResult {
            valid: violations.is_empty(),
            violations,
            warnings,
            skipped_triads,
            required_triad,
            enforcement_mode,
        }
    }
}

/// A conditional requirement is "triggered" when any of the metrics it
/// names meets or exceeds its threshold. Absent metrics never trigger.
fn condition_triggered(condition: &crate::schema::Condition, metrics: &Metrics) -> bool {
    let thresholds = &condition.metrics;

    if let (Some(threshold), Some(actual)) = (&thresholds.content_created, &metrics.content_created) {
        if threshold.units == actual.units && actual.quantity >= threshold.threshold {
            return true;
        }
    }

    if let (Some(threshold), Some(actual)) = (thresholds.components_modified, metrics.components_modified) {
        if actual >= threshold {
            return true;
        }
    }

    if let (Some(threshold), Some(actual)) = (thresholds.complexity, metrics.complexity) {
        if actual >= threshold {
            return true;
        }
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::{CompletedTriad, InstanceMetadata, WorkflowProgress};
    use crate::schema::{
        Condition, ConditionMetrics, ContentCreatedThreshold, EnforcementConfig, TriadDefinition,
    };
    use std::collections::HashMap;

    fn software_schema() -> WorkflowSchema {
        WorkflowSchema {
            workflow_name: "software-development".into(),
            version: "1.0.0".into(),
            triads: vec![
                TriadDefinition { id: "idea-validation".into(), name: "Idea Validation".into(), triad_type: "research".into(), required: true },
                TriadDefinition { id: "design".into(), name: "Design".into(), triad_type: "architecture".into(), required: true },
                TriadDefinition { id: "implementation".into(), name: "Implementation".into(), triad_type: "development".into(), required: true },
                TriadDefinition { id: "garden-tending".into(), name: "Garden Tending".into(), triad_type: "quality".into(), required: false },
                TriadDefinition { id: "deployment".into(), name: "Deployment".into(), triad_type: "release".into(), required: true },
            ],
            enforcement: EnforcementConfig {
                mode: EnforcementMode::Recommended,
                per_triad_overrides: HashMap::from([("deployment".to_string(), EnforcementMode::Strict)]),
            },
            workflow_rules: vec![
                WorkflowRule::SequentialProgression { track_deviations: true },
                WorkflowRule::ConditionalRequirement {
                    gate_triad: "garden-tending".into(),
                    before_triad: "deployment".into(),
                    condition: Condition {
                        condition_type: "significance_threshold".into(),
                        metrics: ConditionMetrics {
                            content_created: Some(ContentCreatedThreshold { threshold: 100.0, units: "lines".into() }),
                            components_modified: None,
                            complexity: None,
                        },
                    },
                    bypass_allowed: true,
                },
            ],
        }
    }

    fn always_exists(_: &str) -> bool {
        true
    }

    fn instance_with_completed(completed: &[&str]) -> WorkflowInstance {
        WorkflowInstance {
            instance_id: "test-instance".into(),
            workflow_type: "software-development".into(),
            metadata: InstanceMetadata {
                title: "Test".into(),
                started_by: "test@example.com".into(),
                started_at: chrono::Utc::now(),
                status: "in_progress".into(),
                completed_at: None,
                abandon_reason: None,
                abandoned_at: None,
                extra: HashMap::new(),
            },
            workflow_progress: WorkflowProgress {
                current_triad: completed.last().map(|s| s.to_string()),
                completed_triads: completed
                    .iter()
                    .map(|id| CompletedTriad { triad_id: id.to_string(), completed_at: chrono::Utc::now(), duration_minutes: 0.0 })
                    .collect(),
                skipped_triads: vec![],
            },
            workflow_deviations: vec![],
            significance_metrics: serde_json::Value::Null,
        }
    }

    #[test]
    fn test_first_triad_is_valid() {
        let schema = software_schema();
        let instance = instance_with_completed(&[]);
        let result = Validator::new(&schema).validate_transition(&instance, "idea-validation", &always_exists, None);
        assert!(result.valid);
        assert!(result.warnings.is_empty());
        assert_eq!(result.enforcement_mode, EnforcementMode::Recommended);
    }

    #[test]
    fn test_sequential_transition_is_valid() {
        let schema = software_schema();
        let instance = instance_with_completed(&["idea-validation"]);
        let result = Validator::new(&schema).validate_transition(&instance, "design", &always_exists, None);
        assert!(result.valid);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_unknown_triad_is_a_violation() {
        let schema = software_schema();
        let instance = instance_with_completed(&[]);
        let result = Validator::new(&schema).validate_transition(&instance, "unknown-triad", &always_exists, None);
        assert!(!result.valid);
        assert!(result.violations[0].contains("not found in workflow schema"));
    }

    #[test]
    fn test_triad_missing_from_filesystem_is_a_violation() {
        let schema = software_schema();
        let instance = instance_with_completed(&[]);
        let result = Validator::new(&schema).validate_transition(&instance, "idea-validation", &|_| false, None);
        assert!(!result.valid);
        assert!(result.violations[0].contains("not found in .claude/agents/"));
    }

    #[test]
    fn test_skipping_one_triad_warns() {
        let schema = software_schema();
        let instance = instance_with_completed(&["idea-validation"]);
        let result = Validator::new(&schema).validate_transition(&instance, "implementation", &always_exists, None);
        assert!(result.warnings[0].to_lowercase().contains("skipping"));
        assert_eq!(result.skipped_triads, vec!["design"]);
    }

    #[test]
    fn test_skipping_multiple_required_triads() {
        let schema = software_schema();
        let instance = instance_with_completed(&[]);
        let result = Validator::new(&schema).validate_transition(&instance, "deployment", &always_exists, None);
        assert_eq!(result.skipped_triads.len(), 3);
        assert!(result.skipped_triads.contains(&"idea-validation".to_string()));
        assert!(result.skipped_triads.contains(&"design".to_string()));
        assert!(result.skipped_triads.contains(&"implementation".to_string()));
    }

    #[test]
    fn test_backward_movement_warns() {
        let schema = software_schema();
        let instance = instance_with_completed(&["idea-validation", "design", "implementation"]);
        let result = Validator::new(&schema).validate_transition(&instance, "design", &always_exists, None);
        assert!(result.warnings[0].to_lowercase().contains("backward"));
    }

    #[test]
    fn test_conditional_requirement_triggered_by_substantial_metrics() {
        let schema = software_schema();
        let instance = instance_with_completed(&["idea-validation", "design", "implementation"]);
        let metrics = Metrics {
            content_created: Some(ContentCreated { quantity: 257.0, units: "lines".into() }),
            components_modified: Some(8),
            complexity: None,
        };
        let result = Validator::new(&schema).validate_transition(&instance, "deployment", &always_exists, Some(&metrics));
        assert!(!result.valid);
        assert_eq!(result.required_triad.as_deref(), Some("garden-tending"));
    }

    #[test]
    fn test_conditional_requirement_not_triggered_by_minimal_metrics() {
        let schema = software_schema();
        let instance = instance_with_completed(&["idea-validation", "design", "implementation"]);
        let metrics = Metrics {
            content_created: Some(ContentCreated { quantity: 30.0, units: "lines".into() }),
            components_modified: Some(2),
            complexity: None,
        };
        let result = Validator::new(&schema).validate_transition(&instance, "deployment", &always_exists, Some(&metrics));
        assert!(result.required_triad.is_none());
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_gate_already_completed_skips_requirement() {
        let schema = software_schema();
        let instance = instance_with_completed(&["idea-validation", "design", "implementation", "garden-tending"]);
        let metrics = Metrics {
            content_created: Some(ContentCreated { quantity: 257.0, units: "lines".into() }),
            components_modified: None,
            complexity: None,
        };
        let result = Validator::new(&schema).validate_transition(&instance, "deployment", &always_exists, Some(&metrics));
        assert!(result.required_triad.is_none());
        assert!(result.violations.is_empty());
    }

    #[test]
    fn test_missing_metrics_never_triggers_gate() {
        let schema = software_schema();
        let instance = instance_with_completed(&["idea-validation", "design", "implementation"]);
        let result = Validator::new(&schema).validate_transition(&instance, "deployment", &always_exists, None);
        assert!(result.required_triad.is_none());
    }

    #[test]
    fn test_per_triad_override_applies() {
        let schema = software_schema();
        let instance = instance_with_completed(&[]);
        let deployment = Validator::new(&schema).validate_transition(&instance, "deployment", &always_exists, None);
        assert_eq!(deployment.enforcement_mode, EnforcementMode::Strict);
        let design = Validator::new(&schema).validate_transition(&instance, "design", &always_exists, None);
        assert_eq!(design.enforcement_mode, EnforcementMode::Recommended);
    }
}

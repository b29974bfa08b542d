//! Extract-lessons: turn free-form conversation text into ProcessKnowledge
//! nodes via three independent detection methods.

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use triad_blocks::{extract_process_knowledge, ChecklistItemSpec};
use triad_graph::{ChecklistItem, Node, NodeStatus, NodeType, Priority, ProcessKnowledge, ProcessType, TriggerConditions};
use triad_support::time::now;

/// Confidence at or above this threshold makes a freshly extracted lesson
/// immediately `active`; below it, the lesson needs human validation first.
const CONFIDENCE_ACTIVE_THRESHOLD: f64 = 0.7;

const DEPLOYMENT_CONTEXT_KEYWORDS: &[&str] = &["deploy", "deployment", "production", "release", "rollout"];
const SECURITY_KEYWORDS: &[&str] = &[
    "password", "secret", "credential", "token", "vulnerability", "injection", "xss", "csrf",
    "auth", "encryption", "exploit",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSource {
    Explicit,
    UserCorrection,
    RepeatedMistake,
}

impl DetectionSource {
    fn base_confidence(self) -> f64 {
        match self {
            DetectionSource::Explicit => 0.8,
            DetectionSource::UserCorrection => 0.6,
            DetectionSource::RepeatedMistake => 0.5,
        }
    }
}

#[derive(Debug, Clone)]
struct LessonCandidate {
    source: DetectionSource,
    label: String,
    explicit_priority: Option<Priority>,
    process_type: ProcessType,
    repetition_count: u32,
    trigger_conditions: HashMap<String, serde_json::Value>,
    checklist: Vec<ChecklistItemSpec>,
}

fn user_correction_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)you missed (.+?)[.!\n]",
            r"(?i)you forgot (.+?)[.!\n]",
            r"(?i)you should have (.+?)[.!\n]",
            r"(?i)don't forget (?:to )?(.+?)[.!\n]",
            r"(?i)remember to (.+?)[.!\n]",
            r"(?i)why didn't you (.+?)[?.!\n]",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern is valid"))
        .collect()
    })
}

fn repeated_mistake_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)(.+?) again[.!\n]",
            r"(?i)(.+?) is still missing[.!\n]",
            r"(?i)another (.+?)[.!\n]",
        ]
        .iter()
        .map(|p| Regex::new(p).expect("static pattern is valid"))
        .collect()
    })
}

fn detect_from_patterns(text: &str, patterns: &[Regex], source: DetectionSource) -> Vec<LessonCandidate> {
    let mut candidates = Vec::new();
    for pattern in patterns {
        for capture in pattern.captures_iter(text) {
            let Some(matched) = capture.get(1) else { continue };
            let label = matched.as_str().trim().to_string();
            if label.is_empty() {
                continue;
            }
            let repetition_count = patterns
                .iter()
                .map(|p| p.captures_iter(text).filter(|c| c.get(1).map(|m| m.as_str().trim()) == Some(label.as_str())).count())
                .sum::<usize>()
                .max(1) as u32;
            candidates.push(LessonCandidate {
                source,
                label,
                explicit_priority: None,
                process_type: ProcessType::Warning,
                repetition_count,
                trigger_conditions: HashMap::new(),
                checklist: Vec::new(),
            });
        }
    }
    candidates
}

fn detect_explicit(text: &str) -> Vec<LessonCandidate> {
    extract_process_knowledge(text)
        .into_iter()
        .filter_map(|block| {
            let label = block.field_str("label")?.to_string();
            let priority = block.field_str("priority").and_then(parse_priority);
            let process_type = block
                .field_str("process_type")
                .and_then(parse_process_type)
                .unwrap_or(ProcessType::Pattern);
            let trigger_conditions = block.trigger_conditions.clone();
            let checklist = block.checklist.clone();
            Some(LessonCandidate {
                source: DetectionSource::Explicit,
                label,
                explicit_priority: priority,
                process_type,
                repetition_count: 1,
                trigger_conditions,
                checklist,
            })
        })
        .collect()
}

fn parse_priority(raw: &str) -> Option<Priority> {
    match raw.to_ascii_uppercase().as_str() {
        "CRITICAL" => Some(Priority::Critical),
        "HIGH" => Some(Priority::High),
        "MEDIUM" => Some(Priority::Medium),
        "LOW" => Some(Priority::Low),
        _ => None,
    }
}

fn parse_process_type(raw: &str) -> Option<ProcessType> {
    match raw.to_ascii_lowercase().as_str() {
        "checklist" => Some(ProcessType::Checklist),
        "pattern" => Some(ProcessType::Pattern),
        "warning" => Some(ProcessType::Warning),
        "requirement" => Some(ProcessType::Requirement),
        _ => None,
    }
}

/// Priority resolution order: explicit field wins, then source-driven
/// defaults, then keyword-driven escalation, then the `Low` fallback.
fn resolve_priority(candidate: &LessonCandidate, active_triad: Option<&str>) -> Priority {
    if let Some(priority) = candidate.explicit_priority {
        return priority;
    }
    match candidate.source {
        DetectionSource::UserCorrection => return Priority::Critical,
        DetectionSource::RepeatedMistake => return Priority::High,
        DetectionSource::Explicit => {}
    }

    let label_lower = candidate.label.to_ascii_lowercase();
    let is_deployment_context = DEPLOYMENT_CONTEXT_KEYWORDS.iter().any(|kw| label_lower.contains(kw));
    if is_deployment_context && active_triad == Some("deployment") {
        return Priority::Critical;
    }
    if SECURITY_KEYWORDS.iter().any(|kw| label_lower.contains(kw)) {
        return Priority::High;
    }
    Priority::Low
}

fn priority_bonus(priority: Priority) -> f64 {
    match priority {
        Priority::Critical => 0.15,
        Priority::High => 0.10,
        Priority::Medium => 0.05,
        Priority::Low => 0.0,
    }
}

/// Deterministic, bounded confidence mapping from detection source,
/// resolved priority, and how many times the same lesson recurred.
fn compute_confidence(source: DetectionSource, priority: Priority, repetition_count: u32) -> f64 {
    let repetition_bonus = (repetition_count.saturating_sub(1) as f64 * 0.05).min(0.2);
    (source.base_confidence() + priority_bonus(priority) + repetition_bonus).min(1.0)
}

/// Pulls a `trigger_conditions.<key>` JSON value (expected to be a string
/// array) out of the raw map parsed from a `[PROCESS_KNOWLEDGE]` block.
fn trigger_string_list(raw: &HashMap<String, serde_json::Value>, key: &str) -> Vec<String> {
    raw.get(key)
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|v| v.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

fn build_trigger_conditions(raw: &HashMap<String, serde_json::Value>) -> TriggerConditions {
    TriggerConditions {
        tool_names: trigger_string_list(raw, "tool_names"),
        file_patterns: trigger_string_list(raw, "file_patterns"),
        action_keywords: trigger_string_list(raw, "action_keywords"),
        context_keywords: trigger_string_list(raw, "context_keywords"),
        triad_names: trigger_string_list(raw, "triad_names"),
    }
}

fn build_checklist(specs: &[ChecklistItemSpec]) -> Vec<ChecklistItem> {
    specs
        .iter()
        .map(|spec| ChecklistItem { item: spec.item.clone(), required: spec.required, file: spec.file.clone() })
        .collect()
}

fn build_node(candidate: LessonCandidate, actor: &str, active_triad: Option<&str>) -> Node {
    let priority = resolve_priority(&candidate, active_triad);
    let confidence = compute_confidence(candidate.source, priority, candidate.repetition_count);
    let status = if confidence >= CONFIDENCE_ACTIVE_THRESHOLD {
        NodeStatus::Active
    } else {
        NodeStatus::NeedsValidation
    };
    let now = now();
    let trigger_conditions = build_trigger_conditions(&candidate.trigger_conditions);
    let checklist = build_checklist(&candidate.checklist);

    Node {
        id: format!("lesson_{}", now.timestamp_nanos_opt().unwrap_or_default()),
        node_type: NodeType::Concept,
        label: candidate.label,
        description: String::new(),
        confidence,
        evidence: Vec::new(),
        created_by: actor.to_string(),
        created_at: now,
        updated_at: now,
        updated_by: None,
        priority: Some(priority),
        status: Some(status),
        process_knowledge: Some(ProcessKnowledge {
            process_type: candidate.process_type,
            trigger_conditions,
            checklist,
            success_count: 0,
            failure_count: 0,
            confirmation_count: 0,
            contradiction_count: 0,
            injection_count: 0,
            last_outcome: None,
            outcome_history: Vec::new(),
            deprecated_at: None,
            deprecated_reason: None,
        }),
        extra: Default::default(),
    }
}

/// Runs all three detection methods over `text` and returns a
/// ProcessKnowledge node per lesson found.
pub fn extract_lessons(text: &str, actor: &str, active_triad: Option<&str>) -> Vec<Node> {
    let mut candidates = detect_explicit(text);
    candidates.extend(detect_from_patterns(text, user_correction_patterns(), DetectionSource::UserCorrection));
    candidates.extend(detect_from_patterns(text, repeated_mistake_patterns(), DetectionSource::RepeatedMistake));

    candidates
        .into_iter()
        .map(|c| build_node(c, actor, active_triad))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_process_knowledge_block_detected() {
        let text = "[PROCESS_KNOWLEDGE]\ntype: Concept\nlabel: Always run migrations before deploy\npriority: CRITICAL\nprocess_type: checklist\n[/PROCESS_KNOWLEDGE]";
        let nodes = extract_lessons(text, "agent", None);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].priority, Some(Priority::Critical));
        assert_eq!(nodes[0].process_knowledge.as_ref().unwrap().process_type, ProcessType::Checklist);
    }

    #[test]
    fn test_user_correction_pattern_detected_as_critical() {
        let text = "You missed updating the changelog.";
        let nodes = extract_lessons(text, "agent", None);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].priority, Some(Priority::Critical));
        assert!(nodes[0].label.contains("updating the changelog"));
    }

    #[test]
    fn test_repeated_mistake_pattern_detected_as_high() {
        let text = "The build is broken again.";
        let nodes = extract_lessons(text, "agent", None);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].priority, Some(Priority::High));
    }

    #[test]
    fn test_deployment_context_in_deployment_triad_escalates_to_critical() {
        let text = "[PROCESS_KNOWLEDGE]\ntype: Concept\nlabel: Forgot to run the production deploy checklist\nprocess_type: warning\n[/PROCESS_KNOWLEDGE]";
        let nodes = extract_lessons(text, "agent", Some("deployment"));
        assert_eq!(nodes[0].priority, Some(Priority::Critical));
    }

    #[test]
    fn test_deployment_context_outside_deployment_triad_is_not_escalated() {
        let text = "[PROCESS_KNOWLEDGE]\ntype: Concept\nlabel: Forgot to run the production deploy checklist\nprocess_type: warning\n[/PROCESS_KNOWLEDGE]";
        let nodes = extract_lessons(text, "agent", Some("design"));
        assert_ne!(nodes[0].priority, Some(Priority::Critical));
    }

    #[test]
    fn test_security_keyword_escalates_to_high() {
        let text = "[PROCESS_KNOWLEDGE]\ntype: Concept\nlabel: Never log the auth token\nprocess_type: warning\n[/PROCESS_KNOWLEDGE]";
        let nodes = extract_lessons(text, "agent", None);
        assert_eq!(nodes[0].priority, Some(Priority::High));
    }

    #[test]
    fn test_default_priority_is_low() {
        let text = "[PROCESS_KNOWLEDGE]\ntype: Concept\nlabel: Prefer tabs in this codebase\nprocess_type: pattern\n[/PROCESS_KNOWLEDGE]";
        let nodes = extract_lessons(text, "agent", None);
        assert_eq!(nodes[0].priority, Some(Priority::Low));
    }

    #[test]
    fn test_explicit_priority_field_wins_over_source_default() {
        let text = "[PROCESS_KNOWLEDGE]\ntype: Concept\nlabel: A trivial style note\npriority: MEDIUM\nprocess_type: pattern\n[/PROCESS_KNOWLEDGE]";
        let nodes = extract_lessons(text, "agent", None);
        assert_eq!(nodes[0].priority, Some(Priority::Medium));
    }

    #[test]
    fn test_high_confidence_lesson_is_immediately_active() {
        let text = "[PROCESS_KNOWLEDGE]\ntype: Concept\nlabel: Critical item\npriority: CRITICAL\nprocess_type: checklist\n[/PROCESS_KNOWLEDGE]";
        let nodes = extract_lessons(text, "agent", None);
        assert_eq!(nodes[0].status, Some(NodeStatus::Active));
    }

    #[test]
    fn test_explicit_lesson_with_no_priority_is_immediately_active() {
        let text = "[PROCESS_KNOWLEDGE]\ntype: Concept\nlabel: Minor note\nprocess_type: pattern\n[/PROCESS_KNOWLEDGE]";
        let nodes = extract_lessons(text, "agent", None);
        assert_eq!(nodes[0].confidence, 0.8);
        assert_eq!(nodes[0].status, Some(NodeStatus::Active));
    }

    #[test]
    fn test_repeated_mistake_below_threshold_needs_validation() {
        let text = "The linter warning is still missing.";
        let nodes = extract_lessons(text, "agent", None);
        assert!(nodes[0].confidence < CONFIDENCE_ACTIVE_THRESHOLD);
        assert_eq!(nodes[0].status, Some(NodeStatus::NeedsValidation));
    }

    #[test]
    fn test_no_lessons_in_plain_text() {
        assert!(extract_lessons("Just a normal sentence with no signals.", "agent", None).is_empty());
    }

    #[test]
    fn test_explicit_trigger_conditions_and_checklist_survive_into_node() {
        let text = r#"[PROCESS_KNOWLEDGE]
type: Concept
label: Always run migrations before deploy
priority: CRITICAL
process_type: checklist
trigger_conditions.tool_names: ["Write", "Edit"]
trigger_conditions.file_patterns: ["*/VERSION"]
checklist:
- item: Run database migrations
  required: true
- item: Update changelog
  required: false
  file: CHANGELOG.md
[/PROCESS_KNOWLEDGE]"#;
        let nodes = extract_lessons(text, "agent", None);
        assert_eq!(nodes.len(), 1);
        let knowledge = nodes[0].process_knowledge.as_ref().unwrap();
        assert_eq!(knowledge.trigger_conditions.tool_names, vec!["Write".to_string(), "Edit".to_string()]);
        assert_eq!(knowledge.trigger_conditions.file_patterns, vec!["*/VERSION".to_string()]);
        assert_eq!(knowledge.checklist.len(), 2);
        assert_eq!(knowledge.checklist[0].item, "Run database migrations");
        assert!(knowledge.checklist[0].required);
        assert_eq!(knowledge.checklist[1].file.as_deref(), Some("CHANGELOG.md"));
    }
}

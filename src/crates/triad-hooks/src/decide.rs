//! Pure pre-tool-use interjection decision logic. No I/O, no process
//! exit codes — those live in the `triad-hook` binary's thin shell.

use serde::{Deserialize, Serialize};
use triad_graph::{glob_match, Graph, NodeStatus, Priority, ProcessType};

const READ_ONLY_TOOLS: &[&str] = &["Read", "Grep", "Glob"];
const SAFE_BASH_PREFIXES: &[&str] = &["ls", "cat ", "git status", "git diff", "echo ", "grep "];
const RISKY_BASH_PREFIXES: &[&str] = &["git commit", "git push", "rm ", "rm -rf", "sudo ", "chmod ", "mv "];
const VERSION_FILE_PATTERNS: &[&str] = &[
    "*/VERSION", "VERSION", "*/Cargo.toml", "Cargo.toml", "*/package.json", "package.json",
    "*/pyproject.toml", "pyproject.toml",
];
const CONFIDENCE_BLOCK_VERSION_FILE: f64 = 0.85;
const CONFIDENCE_BLOCK_VERY_HIGH: f64 = 0.95;
const MAX_INTERJECTION_ITEMS: usize = 5;

/// The `{tool_name, tool_input, cwd}` payload a pre-tool-use hook reads
/// from stdin.
#[derive(Debug, Clone, Deserialize)]
pub struct PreToolUseInput {
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
    #[serde(default)]
    pub cwd: String,
}

impl PreToolUseInput {
    fn file_path(&self) -> Option<&str> {
        for key in ["file_path", "path", "notebook_path"] {
            if let Some(v) = self.tool_input.get(key).and_then(|v| v.as_str()) {
                return Some(v);
            }
        }
        None
    }

    fn bash_command(&self) -> Option<&str> {
        if self.tool_name != "Bash" {
            return None;
        }
        self.tool_input.get("command").and_then(|v| v.as_str())
    }
}

/// Environment-derived switches that change hook behavior without
/// changing the decision logic itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct HookEnv {
    pub no_experience: bool,
    pub no_block: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum HookOutcome {
    Noop,
    Inject { additional_context: String },
    Block { message: String },
}

fn is_read_only(tool_name: &str) -> bool {
    READ_ONLY_TOOLS.contains(&tool_name)
}

fn is_safe_bash(command: &str) -> bool {
    SAFE_BASH_PREFIXES.iter().any(|p| command.trim_start().starts_with(p))
}

fn is_risky_bash(command: &str) -> bool {
    RISKY_BASH_PREFIXES.iter().any(|p| command.trim_start().starts_with(p))
}

fn is_version_file(path: &str) -> bool {
    VERSION_FILE_PATTERNS.iter().any(|pat| glob_match(pat, path))
}

/// One ProcessKnowledge node, matched against the current tool call.
struct MatchedKnowledge<'a> {
    label: &'a str,
    priority: Priority,
    confidence: f64,
    process_type: ProcessType,
    checklist_labels: Vec<String>,
    checklist_files: Vec<String>,
}

fn matched_knowledge<'a>(
    graph: &'a Graph,
    input: &PreToolUseInput,
    active_triad: Option<&str>,
) -> Vec<MatchedKnowledge<'a>> {
    let file_path = input.file_path();
    graph
        .nodes
        .iter()
        .filter(|n| n.status == Some(NodeStatus::Active))
        .filter_map(|n| {
            let pk = n.process_knowledge.as_ref()?;
            let matches = pk.trigger_conditions.matches(
                Some(input.tool_name.as_str()),
                file_path,
                &[],
                &[],
                active_triad,
            );
            if !matches {
                return None;
            }
            Some(MatchedKnowledge {
                label: n.label.as_str(),
                priority: n.priority.unwrap_or(Priority::Low),
                confidence: n.confidence,
                process_type: pk.process_type,
                checklist_labels: pk.checklist.iter().map(|c| c.item.clone()).collect(),
                checklist_files: pk.checklist.iter().filter_map(|c| c.file.clone()).collect(),
            })
        })
        .collect()
}

fn should_block(node: &MatchedKnowledge, file_path: Option<&str>) -> bool {
    let block_version_file = node.priority == Priority::Critical
        && node.process_type == ProcessType::Checklist
        && file_path.map(is_version_file).unwrap_or(false)
        && node.confidence >= CONFIDENCE_BLOCK_VERSION_FILE;

    let block_very_high_confidence = node.priority == Priority::Critical && node.confidence >= CONFIDENCE_BLOCK_VERY_HIGH;

    block_version_file || block_very_high_confidence
}

fn render_block_message(node: &MatchedKnowledge) -> String {
    let mut message = format!("🛑 {}\n", node.label);
    for item in node.checklist_labels.iter().take(MAX_INTERJECTION_ITEMS) {
        message.push_str(&format!("- {item}\n"));
    }
    if !node.checklist_files.is_empty() {
        message.push_str(&format!("Files to check: {}\n", node.checklist_files.join(", ")));
    }
    message
}

fn render_inject_context(matches: &[MatchedKnowledge]) -> String {
    let mut lines = Vec::new();
    for node in matches.iter().take(MAX_INTERJECTION_ITEMS) {
        lines.push(format!("- [{:?}] {}", node.priority, node.label));
    }
    lines.join("\n")
}

/// The pure decision function: given a tool call, the active triad's
/// graph, and the environment, decide what the hook should do.
pub fn decide(input: &PreToolUseInput, graph: &Graph, active_triad: Option<&str>, env: HookEnv) -> HookOutcome {
    if is_read_only(&input.tool_name) {
        return HookOutcome::Noop;
    }
    if env.no_experience {
        return HookOutcome::Noop;
    }
    if let Some(command) = input.bash_command() {
        if is_safe_bash(command) {
            return HookOutcome::Noop;
        }
        if !is_risky_bash(command) {
            return HookOutcome::Noop;
        }
    }

    let matches = matched_knowledge(graph, input, active_triad);
    if matches.is_empty() {
        return HookOutcome::Noop;
    }

    let file_path = input.file_path();
    if let Some(blocking) = matches.iter().find(|n| should_block(n, file_path)) {
        if !env.no_block {
            return HookOutcome::Block { message: render_block_message(blocking) };
        }
    }

    HookOutcome::Inject { additional_context: render_inject_context(&matches) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use triad_graph::{ChecklistItem, Node, NodeType, ProcessKnowledge, TriggerConditions};

    fn checklist_node(priority: Priority, confidence: f64, process_type: ProcessType) -> Node {
        Node {
            id: "pk1".into(),
            node_type: NodeType::Concept,
            label: "Run migrations before deploy".into(),
            description: String::new(),
            confidence,
            evidence: vec![],
            created_by: "agent".into(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
            updated_by: None,
            priority: Some(priority),
            status: Some(NodeStatus::Active),
            process_knowledge: Some(ProcessKnowledge {
                process_type,
                trigger_conditions: TriggerConditions {
                    file_patterns: vec!["*/VERSION".to_string()],
                    tool_names: vec!["Write".to_string(), "Edit".to_string()],
                    ..Default::default()
                },
                checklist: vec![ChecklistItem { item: "Bump version".into(), required: true, file: Some("VERSION".into()) }],
                success_count: 0,
                failure_count: 0,
                confirmation_count: 0,
                contradiction_count: 0,
                injection_count: 0,
                last_outcome: None,
                outcome_history: vec![],
                deprecated_at: None,
                deprecated_reason: None,
            }),
            extra: Default::default(),
        }
    }

    fn graph_with(node: Node) -> Graph {
        let mut g = Graph::empty("implementation");
        g.nodes.push(node);
        g
    }

    fn write_input(path: &str) -> PreToolUseInput {
        PreToolUseInput {
            tool_name: "Write".to_string(),
            tool_input: serde_json::json!({"file_path": path}),
            cwd: "/repo".to_string(),
        }
    }

    #[test]
    fn test_read_only_tool_is_always_noop() {
        let graph = graph_with(checklist_node(Priority::Critical, 0.99, ProcessType::Checklist));
        let input = PreToolUseInput { tool_name: "Read".to_string(), tool_input: serde_json::json!({"file_path": "VERSION"}), cwd: String::new() };
        assert_eq!(decide(&input, &graph, None, HookEnv::default()), HookOutcome::Noop);
    }

    #[test]
    fn test_no_experience_flag_disables_entirely() {
        let graph = graph_with(checklist_node(Priority::Critical, 0.99, ProcessType::Checklist));
        let input = write_input("VERSION");
        let env = HookEnv { no_experience: true, no_block: false };
        assert_eq!(decide(&input, &graph, None, env), HookOutcome::Noop);
    }

    #[test]
    fn test_safe_bash_command_never_intercepted() {
        let graph = graph_with(checklist_node(Priority::Critical, 0.99, ProcessType::Checklist));
        let input = PreToolUseInput { tool_name: "Bash".to_string(), tool_input: serde_json::json!({"command": "git status"}), cwd: String::new() };
        assert_eq!(decide(&input, &graph, None, HookEnv::default()), HookOutcome::Noop);
    }

    #[test]
    fn test_unrecognized_bash_command_defaults_safe() {
        let graph = graph_with(checklist_node(Priority::Critical, 0.99, ProcessType::Checklist));
        let input = PreToolUseInput { tool_name: "Bash".to_string(), tool_input: serde_json::json!({"command": "my-custom-tool --flag"}), cwd: String::new() };
        assert_eq!(decide(&input, &graph, None, HookEnv::default()), HookOutcome::Noop);
    }

    #[test]
    fn test_block_for_version_file_with_checklist_and_high_confidence() {
        let graph = graph_with(checklist_node(Priority::Critical, 0.9, ProcessType::Checklist));
        let input = write_input("VERSION");
        match decide(&input, &graph, None, HookEnv::default()) {
            HookOutcome::Block { message } => {
                assert!(message.contains("Bump version"));
                assert!(message.contains("VERSION"));
            }
            other => panic!("expected Block, got {other:?}"),
        }
    }

    #[test]
    fn test_block_for_very_high_confidence_regardless_of_file() {
        let mut node = checklist_node(Priority::Critical, 0.97, ProcessType::Pattern);
        node.process_knowledge.as_mut().unwrap().trigger_conditions.file_patterns = vec![];
        node.process_knowledge.as_mut().unwrap().trigger_conditions.tool_names = vec!["Write".to_string()];
        let graph = graph_with(node);
        let input = write_input("src/lib.rs");
        assert!(matches!(decide(&input, &graph, None, HookEnv::default()), HookOutcome::Block { .. }));
    }

    #[test]
    fn test_below_confidence_threshold_injects_instead_of_blocking() {
        let graph = graph_with(checklist_node(Priority::Critical, 0.6, ProcessType::Checklist));
        let input = write_input("VERSION");
        assert!(matches!(decide(&input, &graph, None, HookEnv::default()), HookOutcome::Inject { .. }));
    }

    #[test]
    fn test_no_block_env_downgrades_block_to_inject() {
        let graph = graph_with(checklist_node(Priority::Critical, 0.99, ProcessType::Checklist));
        let input = write_input("VERSION");
        let env = HookEnv { no_experience: false, no_block: true };
        assert!(matches!(decide(&input, &graph, None, env), HookOutcome::Inject { .. }));
    }

    #[test]
    fn test_no_matching_knowledge_is_noop() {
        let graph = Graph::empty("implementation");
        let input = write_input("src/lib.rs");
        assert_eq!(decide(&input, &graph, None, HookEnv::default()), HookOutcome::Noop);
    }

    #[test]
    fn test_risky_bash_command_can_be_blocked() {
        let mut node = checklist_node(Priority::Critical, 0.99, ProcessType::Checklist);
        node.process_knowledge.as_mut().unwrap().trigger_conditions.tool_names = vec!["Bash".to_string()];
        node.process_knowledge.as_mut().unwrap().trigger_conditions.file_patterns = vec![];
        let graph = graph_with(node);
        let input = PreToolUseInput { tool_name: "Bash".to_string(), tool_input: serde_json::json!({"command": "rm -rf build/"}), cwd: String::new() };
        assert!(matches!(decide(&input, &graph, None, HookEnv::default()), HookOutcome::Block { .. }));
    }
}

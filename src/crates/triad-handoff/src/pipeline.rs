//! Turns one agent's full output into a bounded context block for the next
//! agent, plus any human-in-the-loop gate it raises along the way.

use triad_blocks::{
    extract_graph_updates, extract_section_bullets, first_hitl_prompt, format_agent_context, AgentContextBlock,
};

const DEFAULT_HITL_PROMPT: &str = "Human approval required before proceeding.";

/// Result of handing one agent's output to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffResult {
    /// The `[AGENT_CONTEXT]` block to pass to `to_agent`.
    pub context_block: String,
    /// `true` when the output requested a human-in-the-loop gate. Callers
    /// must surface `hitl_prompt` and wait for approval before invoking the
    /// next agent when this is set.
    pub halt: bool,
    pub hitl_prompt: Option<String>,
}

/// Builds the handoff for one agent transition. `agent_output` is never
/// forwarded in full: only extracted bullets and a graph-update count cross
/// the boundary.
pub fn build_handoff(from_agent: &str, to_agent: &str, agent_output: &str) -> HandoffResult {
    let ctx = AgentContextBlock {
        from: Some(from_agent.to_string()),
        to: Some(to_agent.to_string()),
        graph_update_count: extract_graph_updates(agent_output).len(),
        key_findings: extract_section_bullets(agent_output, "Key Findings"),
        decisions: extract_section_bullets(agent_output, "Decisions"),
        open_questions: extract_section_bullets(agent_output, "Open Questions"),
        recommendations: extract_section_bullets(agent_output, "Recommendations"),
    };
    let context_block = format_agent_context(&ctx);

    let requires_hitl = agent_output.to_uppercase().contains("[HITL_REQUIRED]");
    let hitl_prompt = if requires_hitl {
        Some(first_hitl_prompt(agent_output).unwrap_or_else(|| DEFAULT_HITL_PROMPT.to_string()))
    } else {
        None
    };

    HandoffResult {
        context_block,
        halt: requires_hitl,
        hitl_prompt,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_block_never_contains_raw_graph_updates() {
        let output = "[GRAPH_UPDATE]\ntype: add_node\nnode_id: x\n[/GRAPH_UPDATE]\n## Key Findings\n- API needs pagination";
        let handoff = build_handoff("research-analyst", "implementation-lead", output);
        assert!(!handoff.context_block.contains("[GRAPH_UPDATE]"));
        assert!(handoff.context_block.contains("graph_update_count: 1"));
        assert!(handoff.context_block.contains("API needs pagination"));
    }

    #[test]
    fn test_no_hitl_marker_means_no_halt() {
        let handoff = build_handoff("a", "b", "## Decisions\n- Use Postgres");
        assert!(!handoff.halt);
        assert!(handoff.hitl_prompt.is_none());
    }

    #[test]
    fn test_hitl_marker_halts_with_enclosed_prompt() {
        let output = "[HITL_REQUIRED]\nApprove deleting the staging database?\n[/HITL_REQUIRED]";
        let handoff = build_handoff("a", "b", output);
        assert!(handoff.halt);
        assert_eq!(handoff.hitl_prompt.as_deref(), Some("Approve deleting the staging database?"));
    }

    #[test]
    fn test_hitl_marker_without_prompt_uses_default_message() {
        let output = "[HITL_REQUIRED]\n[/HITL_REQUIRED]";
        let handoff = build_handoff("a", "b", output);
        assert!(handoff.halt);
        assert_eq!(handoff.hitl_prompt.as_deref(), Some(DEFAULT_HITL_PROMPT));
    }

    #[test]
    fn test_bounded_by_extracted_bullets_not_full_output() {
        let huge_output = format!("## Recommendations\n- Add a test\n{}", "noise line\n".repeat(500));
        let handoff = build_handoff("a", "b", &huge_output);
        assert!(handoff.context_block.len() < huge_output.len());
    }
}

//! `[AGENT_CONTEXT]` parsing and formatting.
//!
//! This block is used both as output (the Handoff Pipeline emits one
//! summarizing an agent's work for the next agent) and as input (a later
//! agent may re-parse a block handed to it). `format_agent_context` and
//! `extract_agent_context` are each other's round-trip pair.

use crate::grammar::{find_tag_blocks, split_key_value};
use crate::sections::extract_section_bullets;
use serde::{Deserialize, Serialize};

/// A structured agent-to-agent handoff context.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentContextBlock {
    pub from: Option<String>,
    pub to: Option<String>,
    pub graph_update_count: usize,
    pub key_findings: Vec<String>,
    pub decisions: Vec<String>,
    pub open_questions: Vec<String>,
    pub recommendations: Vec<String>,
}

/// Extract the first `[AGENT_CONTEXT]` block from `text`, if any.
pub fn extract_agent_context(text: &str) -> Option<AgentContextBlock> {
    let body = find_tag_blocks(text, "AGENT_CONTEXT").into_iter().next()?;
    let mut ctx = AgentContextBlock::default();

    for line in body.lines() {
        let line = line.trim();
        if let Some((key, value)) = split_key_value(line) {
            match key.as_str() {
                "from" => ctx.from = Some(value),
                "to" => ctx.to = Some(value),
                "graph_update_count" => {
                    ctx.graph_update_count = value.parse().unwrap_or(0);
                }
                _ => {}
            }
        }
    }

    ctx.key_findings = extract_section_bullets(&body, "Key Findings");
    ctx.decisions = extract_section_bullets(&body, "Decisions");
    ctx.open_questions = extract_section_bullets(&body, "Open Questions");
    ctx.recommendations = extract_section_bullets(&body, "Recommendations");

    Some(ctx)
}

/// Render an `[AGENT_CONTEXT]` block the way the Handoff Pipeline does,
/// bounded by whatever bullets and counts it was given (never the raw tool
/// output).
pub fn format_agent_context(ctx: &AgentContextBlock) -> String {
    let mut out = String::from("[AGENT_CONTEXT]\n");
    if let Some(from) = &ctx.from {
        out.push_str(&format!("from: {from}\n"));
    }
    if let Some(to) = &ctx.to {
        out.push_str(&format!("to: {to}\n"));
    }
    out.push_str(&format!("graph_update_count: {}\n", ctx.graph_update_count));
    append_section(&mut out, "Key Findings", &ctx.key_findings);
    append_section(&mut out, "Decisions", &ctx.decisions);
    append_section(&mut out, "Open Questions", &ctx.open_questions);
    append_section(&mut out, "Recommendations", &ctx.recommendations);
    out.push_str("[/AGENT_CONTEXT]");
    out
}

fn append_section(out: &mut String, header: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {header}\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_fields() {
        let ctx = AgentContextBlock {
            from: Some("senior-developer".into()),
            to: Some("qa-reviewer".into()),
            graph_update_count: 3,
            key_findings: vec!["API requires pagination".into()],
            decisions: vec!["Use cursor-based paging".into()],
            open_questions: vec!["What is the max page size?".into()],
            recommendations: vec!["Add an integration test".into()],
        };
        let rendered = format_agent_context(&ctx);
        let parsed = extract_agent_context(&rendered).unwrap();
        assert_eq!(parsed, ctx);
    }

    #[test]
    fn test_never_embeds_graph_update_blocks() {
        let ctx = AgentContextBlock {
            graph_update_count: 5,
            ..Default::default()
        };
        let rendered = format_agent_context(&ctx);
        assert!(!rendered.contains("[GRAPH_UPDATE]"));
        assert!(rendered.contains("graph_update_count: 5"));
    }

    #[test]
    fn test_extract_missing_block_is_none() {
        assert!(extract_agent_context("no block here").is_none());
    }
}

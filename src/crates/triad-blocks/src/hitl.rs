//! `[HITL_REQUIRED]` extraction.
//!
//! Absence means no human-in-the-loop gate; presence without a closing tag
//! still counts (the fallback takes everything after the opening tag up to
//! the next blank line), since agents occasionally forget to close the tag.

use crate::grammar::find_tag_blocks;

/// The first HITL prompt found in `text`, if any.
pub fn first_hitl_prompt(text: &str) -> Option<String> {
    if let Some(body) = find_tag_blocks(text, "HITL_REQUIRED").into_iter().next() {
        let trimmed = body.trim();
        if !trimmed.is_empty() {
            return Some(trimmed.to_string());
        }
    }

    let marker = "[HITL_REQUIRED]";
    let start = text.find(marker)?;
    let after = &text[start + marker.len()..];
    let prompt: String = after
        .lines()
        .take_while(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

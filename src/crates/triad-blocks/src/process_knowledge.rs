//! `[PROCESS_KNOWLEDGE]` extraction.

use crate::grammar::{coerce_value, find_tag_blocks, is_list_item_line, split_key_value, strip_list_marker};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One `checklist:` line, with its optional `required:`/`file:` continuation
/// lines folded in.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChecklistItemSpec {
    pub item: String,
    pub required: bool,
    pub file: Option<String>,
}

/// A parsed `[PROCESS_KNOWLEDGE]` block, before it becomes a graph node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessKnowledgeBlock {
    pub fields: HashMap<String, serde_json::Value>,
    pub trigger_conditions: HashMap<String, serde_json::Value>,
    pub checklist: Vec<ChecklistItemSpec>,
}

impl ProcessKnowledgeBlock {
    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(|v| v.as_str())
    }
}

/// Extract every `[PROCESS_KNOWLEDGE]` block from `text`.
pub fn extract_process_knowledge(text: &str) -> Vec<ProcessKnowledgeBlock> {
    find_tag_blocks(text, "PROCESS_KNOWLEDGE")
        .into_iter()
        .map(|body| parse_one(&body))
        .collect()
}

fn parse_one(body: &str) -> ProcessKnowledgeBlock {
    let mut block = ProcessKnowledgeBlock::default();
    let mut in_checklist = false;

    for line in body.trim().lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "checklist:" {
            in_checklist = true;
            continue;
        }

        if in_checklist {
            if is_list_item_line(line) {
                let item_line = strip_list_marker(line);
                let item_text = split_key_value(item_line)
                    .filter(|(key, _)| key == "item")
                    .map(|(_, value)| value)
                    .unwrap_or_else(|| item_line.to_string());
                block.checklist.push(ChecklistItemSpec {
                    item: item_text,
                    required: false,
                    file: None,
                });
                continue;
            }
            if let Some((key, value)) = split_key_value(line) {
                if let Some(current) = block.checklist.last_mut() {
                    match key.as_str() {
                        "required" => current.required = value.eq_ignore_ascii_case("true"),
                        "file" => current.file = Some(value),
                        _ => in_checklist = false,
                    }
                    continue;
                }
            }
            in_checklist = false;
        }

        if let Some((key, value)) = split_key_value(line) {
            if let Some(suffix) = key.strip_prefix("trigger_conditions.") {
                block
                    .trigger_conditions
                    .insert(suffix.to_string(), coerce_value(&value));
            } else {
                block.fields.insert(key, coerce_value(&value));
            }
        }
    }

    block
}

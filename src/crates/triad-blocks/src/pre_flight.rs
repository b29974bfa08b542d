//! `[PRE_FLIGHT_CHECK]` extraction.

use crate::grammar::{classify_pass_fail, coerce_value, find_tag_blocks, is_list_item_line, split_key_value, strip_list_marker};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Pass/fail outcome for one checklist line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChecklistStatus {
    Pass,
    Fail,
    Unknown,
}

/// One `- name: text ✅|❌` checklist line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistItemResult {
    pub status: ChecklistStatus,
    pub detail: String,
}

/// A parsed `[PRE_FLIGHT_CHECK]` block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PreFlightCheck {
    pub fields: HashMap<String, serde_json::Value>,
    pub checklist_items: HashMap<String, ChecklistItemResult>,
}

impl PreFlightCheck {
    pub fn node_id(&self) -> Option<&str> {
        self.fields.get("node_id").and_then(|v| v.as_str())
    }

    /// `true` only when `verification_status` is exactly `PASSED`.
    pub fn verification_passed(&self) -> bool {
        self.fields
            .get("verification_status")
            .and_then(|v| v.as_str())
            .map(|s| s.eq_ignore_ascii_case("passed"))
            .unwrap_or(false)
    }
}

/// Extract every `[PRE_FLIGHT_CHECK]` block from `text`.
pub fn extract_pre_flight_checks(text: &str) -> Vec<PreFlightCheck> {
    find_tag_blocks(text, "PRE_FLIGHT_CHECK")
        .into_iter()
        .map(|body| parse_one(&body))
        .collect()
}

fn parse_one(body: &str) -> PreFlightCheck {
    let mut check = PreFlightCheck::default();

    for line in body.trim().lines() {
        let line = line.trim();
        if line.is_empty() || line == "checklist_items:" {
            continue;
        }
        if is_list_item_line(line) {
            let item_line = strip_list_marker(line);
            let Some((name, rest)) = split_key_value(item_line) else {
                continue;
            };
            let status = match classify_pass_fail(&rest) {
                Some(true) => ChecklistStatus::Pass,
                Some(false) => ChecklistStatus::Fail,
                None => ChecklistStatus::Unknown,
            };
            check.checklist_items.insert(
                name,
                ChecklistItemResult {
                    status,
                    detail: rest,
                },
            );
            continue;
        }
        if let Some((key, value)) = split_key_value(line) {
            check.fields.insert(key, coerce_value(&value));
        }
    }

    check
}

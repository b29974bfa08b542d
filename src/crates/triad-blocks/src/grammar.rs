//! Shared low-level parsing primitives used by every block kind.
//!
//! The grammar is deliberately line-oriented and forgiving: a block with a
//! stray or malformed line just drops that line, it never aborts the whole
//! extraction. An unclosed tag produces no block at all, rather than
//! capturing runaway text to the end of input.

use regex::Regex;
use serde_json::Value;

/// Find every `[TAG]...[/TAG]` span in `text` and return each span's inner
/// text. Tag names are matched case-insensitively; unclosed tags are
/// ignored.
pub fn find_tag_blocks(text: &str, tag: &str) -> Vec<String> {
    let escaped = regex::escape(tag);
    let pattern = format!(r"(?is)\[{escaped}\](.*?)\[/{escaped}\]");
    let re = Regex::new(&pattern).expect("block tag pattern is always valid");
    re.captures_iter(text)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Whether a trimmed line is a checklist/list item (`- text`).
pub fn is_list_item_line(line: &str) -> bool {
    line.starts_with("- ") || line == "-"
}

/// Strip a leading `- ` (or `* `) list marker.
pub fn strip_list_marker(line: &str) -> &str {
    line.trim_start_matches("- ")
        .trim_start_matches("* ")
        .trim()
}

/// Split a `key: value` line into its trimmed parts. Returns `None` if the
/// line has no colon.
pub fn split_key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    Some((key.trim().to_string(), value.trim().to_string()))
}

/// Coerce a raw value string: JSON arrays (values starting with `[`) are
/// parsed; everything else is kept as a JSON string.
pub fn coerce_value(raw: &str) -> Value {
    if raw.starts_with('[') {
        if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
            return parsed;
        }
    }
    Value::String(raw.to_string())
}

/// `✅`/`❌` prefixed or embedded value, classified PASS/FAIL. `None` if
/// neither marker is present.
pub fn classify_pass_fail(text: &str) -> Option<bool> {
    if text.contains('\u{2705}') {
        Some(true)
    } else if text.contains('\u{274c}') {
        Some(false)
    } else {
        None
    }
}

//! Markdown section → bullet-list extraction.
//!
//! Used both directly (summarizing Key Findings/Decisions/Open
//! Questions/Recommendations) and by the handoff pipeline to build a
//! bounded `[AGENT_CONTEXT]` block.

/// Extract trimmed bullet items under a `## <header>` heading, up to the
/// next `##` heading or end of text. Recognizes `-`, `*`, and `N.`/`N)`
/// prefixes; a non-bulleted continuation line attaches to the previous item.
pub fn extract_section_bullets(text: &str, header: &str) -> Vec<String> {
    let marker = format!("## {header}");
    let Some(start) = text.find(&marker) else {
        return Vec::new();
    };
    let after = &text[start + marker.len()..];
    let body = match after.find("\n##") {
        Some(end) => &after[..end],
        None => after,
    };

    let mut items: Vec<String> = Vec::new();
    for raw_line in body.lines() {
        let line = raw_line.trim();
        if line.is_empty() {
            continue;
        }
        if let Some(bullet) = strip_bullet_prefix(line) {
            items.push(bullet.to_string());
        } else if let Some(last) = items.last_mut() {
            last.push(' ');
            last.push_str(line);
        }
    }
    items
}

fn strip_bullet_prefix(line: &str) -> Option<&str> {
    if let Some(rest) = line.strip_prefix("- ") {
        return Some(rest.trim());
    }
    if let Some(rest) = line.strip_prefix("* ") {
        return Some(rest.trim());
    }
    let digits: String = line.chars().take_while(|c| c.is_ascii_digit()).collect();
    if !digits.is_empty() {
        let rest = &line[digits.len()..];
        if let Some(stripped) = rest.strip_prefix('.').or_else(|| rest.strip_prefix(')')) {
            return Some(stripped.trim());
        }
    }
    None
}

//! Path-safe identifier validation.
//!
//! Every identifier the runtime turns into part of a filesystem path (triad
//! names, workflow instance ids) passes through here first. Grounded on the
//! teacher pack's workspace path validator: reject traversal sequences,
//! separators, and null bytes at the boundary rather than trying to sanitize
//! them.

use thiserror::Error;

/// An identifier failed the path-safety check.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid identifier {id:?}: {reason}")]
pub struct InvalidIdentifier {
    pub id: String,
    pub reason: String,
}

/// Validate that `id` is safe to use as a single path component: non-empty,
/// no `/`, `\`, `..`, or null bytes, and composed only of ASCII alphanumerics
/// and hyphens (the alnum+hyphens regex called out for instance ids and
/// triad names).
pub fn validate_identifier(id: &str) -> Result<(), InvalidIdentifier> {
    if id.is_empty() {
        return Err(InvalidIdentifier {
            id: id.to_string(),
            reason: "identifier is empty".to_string(),
        });
    }
    if id.contains('\0') {
        return Err(InvalidIdentifier {
            id: id.to_string(),
            reason: "identifier contains a null byte".to_string(),
        });
    }
    if id.contains('/') || id.contains('\\') {
        return Err(InvalidIdentifier {
            id: id.to_string(),
            reason: "identifier contains a path separator".to_string(),
        });
    }
    if id.contains("..") {
        return Err(InvalidIdentifier {
            id: id.to_string(),
            reason: "identifier contains a traversal sequence".to_string(),
        });
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(InvalidIdentifier {
            id: id.to_string(),
            reason: "identifier must be ASCII alphanumeric or hyphen".to_string(),
        });
    }
    Ok(())
}

/// Lowercase, alphanumeric-and-hyphen slug derived from free text, truncated
/// to `max_len`. Used for workflow instance id generation.
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::new();
    let mut last_was_hyphen = true;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug.truncate(max_len);
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}

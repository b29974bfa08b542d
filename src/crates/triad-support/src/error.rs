//! Error context utilities.
//!
//! Adds `.context(...)` to any `Result<T, E>` so diagnostics surfaced to a
//! human (CLI output, hook stderr) carry the chain of "what was this system
//! trying to do" rather than just the leaf error.

use std::error::Error as StdError;
use std::fmt;

/// Adds contextual information to an error.
pub trait ErrorContext<T> {
    /// Wrap the error with a static context message.
    fn context(self, msg: impl Into<String>) -> Result<T, Box<dyn StdError + Send + Sync>>;

    /// Wrap the error with a lazily-computed context message.
    fn with_context<F>(self, f: F) -> Result<T, Box<dyn StdError + Send + Sync>>
    where
        F: FnOnce() -> String;
}

impl<T, E> ErrorContext<T> for Result<T, E>
where
    E: StdError + Send + Sync + 'static,
{
    fn context(self, msg: impl Into<String>) -> Result<T, Box<dyn StdError + Send + Sync>> {
        self.map_err(|e| {
            Box::new(ContextError {
                message: msg.into(),
                source: Box::new(e),
            }) as Box<dyn StdError + Send + Sync>
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, Box<dyn StdError + Send + Sync>>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            Box::new(ContextError {
                message: f(),
                source: Box::new(e),
            }) as Box<dyn StdError + Send + Sync>
        })
    }
}

#[derive(Debug)]
struct ContextError {
    message: String,
    source: Box<dyn StdError + Send + Sync>,
}

impl fmt::Display for ContextError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for ContextError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&*self.source as &(dyn StdError + 'static))
    }
}

/// Format an error chain as a multi-line string, indenting each `Caused by`.
pub fn format_error_chain(error: &dyn StdError) -> String {
    let mut result = format!("Error: {}", error);
    let mut current = error.source();
    let mut level = 1;

    while let Some(source) = current {
        result.push_str(&format!(
            "\n{:indent$}Caused by: {}",
            "",
            source,
            indent = level * 2
        ));
        current = source.source();
        level += 1;
    }

    result
}

/// Walk the error chain to its root cause.
pub fn root_cause(error: &dyn StdError) -> &dyn StdError {
    let mut current = error;
    while let Some(source) = current.source() {
        current = source;
    }
    current
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inner() -> Result<(), std::io::Error> {
        Err(std::io::Error::new(std::io::ErrorKind::NotFound, "missing"))
    }

    fn middle() -> Result<(), Box<dyn StdError + Send + Sync>> {
        inner().context("failed to read graph file")
    }

    #[test]
    fn test_context_message_is_top_level_display() {
        let err = middle().unwrap_err();
        assert_eq!(err.to_string(), "failed to read graph file");
    }

    #[test]
    fn test_format_error_chain_includes_all_levels() {
        let err = middle().unwrap_err();
        let formatted = format_error_chain(&*err);
        assert!(formatted.contains("failed to read graph file"));
        assert!(formatted.contains("missing"));
        assert!(formatted.contains("Caused by:"));
    }

    #[test]
    fn test_root_cause_is_innermost() {
        let err = middle().unwrap_err();
        let root = root_cause(&*err);
        assert_eq!(root.to_string(), "missing");
    }
}

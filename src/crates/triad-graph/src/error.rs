//! Crate-local error taxonomy.
//!
//! Mirrors the kinds, not the names, required by the error handling design:
//! Validation, NotFound, Security, Corruption, and transient I/O each get a
//! distinct variant so callers can branch on `GraphError` without string
//! matching.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    /// Schema or invariant failure in a write request; no side effect occurred.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Requested triad/backup/node was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An identifier or path failed the path-safety check.
    #[error("security: {0}")]
    Security(String),

    /// The on-disk file was not valid JSON or failed structural checks.
    #[error("corrupted graph: {0}")]
    Corruption(String),

    /// Lock contention, disk-full, or another I/O failure during a write.
    #[error("I/O error: {0}")]
    Io(String),
}

impl From<triad_support::ident::InvalidIdentifier> for GraphError {
    fn from(e: triad_support::ident::InvalidIdentifier) -> Self {
        GraphError::Security(e.to_string())
    }
}

impl From<std::io::Error> for GraphError {
    fn from(e: std::io::Error) -> Self {
        GraphError::Io(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GraphError>;

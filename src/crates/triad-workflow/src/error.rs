//! Crate-local error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("instance not found: {0}")]
    InstanceNotFound(String),

    #[error("invalid instance data: {0}")]
    InstanceValidation(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for WorkflowError {
    fn from(e: std::io::Error) -> Self {
        WorkflowError::Io(e.to_string())
    }
}

impl From<triad_support::ident::InvalidIdentifier> for WorkflowError {
    fn from(e: triad_support::ident::InvalidIdentifier) -> Self {
        WorkflowError::InstanceValidation(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WorkflowError>;

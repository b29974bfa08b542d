//! Crate-local error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error(transparent)]
    Graph(#[from] triad_graph::GraphError),
}

pub type Result<T> = std::result::Result<T, KnowledgeError>;

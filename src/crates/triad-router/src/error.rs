//! Crate-local error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RouterError {
    #[error("invalid router state file: {0}")]
    Corruption(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl From<std::io::Error> for RouterError {
    fn from(e: std::io::Error) -> Self {
        RouterError::Io(e.to_string())
    }
}

impl From<triad_support::SupportError> for RouterError {
    fn from(e: triad_support::SupportError) -> Self {
        RouterError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;

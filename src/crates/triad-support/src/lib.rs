//! Ambient stack shared across the triad runtime crates.
//!
//! This crate provides common, boring plumbing so the other crates can stay
//! focused on the orchestration subsystems they own.
//!
//! # Modules
//!
//! - `config` - environment variable loading with validated defaults
//! - `error` - error-chain context helpers
//! - `ident` - path-safe identifier validation and slug generation
//! - `logging` - `tracing-subscriber` initialization
//! - `time` - UTC timestamp helpers (never naive datetimes, per the routing
//!   and workflow timestamp discipline)

pub mod config;
pub mod error;
pub mod ident;
pub mod logging;
pub mod time;

use thiserror::Error;

/// Errors raised by the support crate itself (mostly env/config loading).
#[derive(Debug, Error)]
pub enum SupportError {
    /// An environment variable held invalid UTF-8 or failed to parse.
    #[error("environment variable {key} invalid: {reason}")]
    InvalidEnv { key: String, reason: String },
}

/// Result type for the support crate.
pub type Result<T> = std::result::Result<T, SupportError>;

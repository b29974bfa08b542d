//! Knowledge handler: apply-updates quality gate + graph mutation, and
//! lesson extraction from conversation text into ProcessKnowledge nodes.

pub mod apply_updates;
pub mod error;
pub mod lessons;

pub use apply_updates::{
    apply_updates, ApplyOutcome, ApplyUpdatesReport, DefaultTriadRouter, QualityViolation, TriadRouter,
};
pub use error::{KnowledgeError, Result};
pub use lessons::extract_lessons;

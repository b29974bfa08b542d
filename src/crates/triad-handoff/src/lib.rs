//! Handoff pipeline: bounded agent-to-agent context blocks and
//! human-in-the-loop gate detection.

pub mod pipeline;

pub use pipeline::{build_handoff, HandoffResult};

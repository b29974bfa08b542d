//! Pre-tool-use interjection decision engine.
//!
//! The decision logic is a pure function (`decide`) over a parsed input,
//! a graph, and a small environment struct — no stdin/stdout/exit-code
//! handling here. That shell lives in the `triad-hook` binary so the
//! decision itself stays testable without spawning a process.

pub mod decide;

pub use decide::{decide, HookEnv, HookOutcome, PreToolUseInput};

//! Per-triad persistent knowledge graphs.
//!
//! A [`store::GraphStore`] owns every `<triad>_graph.json` file under a root
//! directory plus its timestamped backups. Writers validate before they
//! touch disk, take an exclusive advisory lock, snapshot the previous
//! version, and write atomically via a sibling temp file and rename.
//!
//! # Modules
//!
//! - `model` - `Graph`/`Node`/`Link`/`ProcessKnowledge` types
//! - `validate` - schema and invariant checking
//! - `repair` - best-effort recovery from partially corrupted JSON
//! - `store` - the locked, atomic, backed-up filesystem store
//! - `error` - crate-local error taxonomy

pub mod error;
pub mod model;
pub mod repair;
pub mod store;
pub mod validate;

pub use error::{GraphError, Result};
pub use model::{
    glob_match, ChecklistItem, Graph, GraphMeta, Link, Node, NodeStatus, NodeType, OutcomeEvent,
    Priority, ProcessKnowledge, ProcessType, TriggerConditions,
};
pub use repair::RepairResult;
pub use store::GraphStore;
pub use validate::{validate, ValidationResult, Violation};

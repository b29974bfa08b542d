//! Semantic routing between triads, with grace-period stickiness, LLM
//! disambiguation for ambiguous prompts, and persisted session state.
//!
//! # Modules
//!
//! - `route` - triad route definitions and cosine-similarity scoring
//! - `decision` - confidence/ambiguity threshold check
//! - `grace` - grace-period state machine and bypass detection
//! - `state` - persisted per-session router state
//! - `telemetry` - rotating JSONL decision log
//! - `llm_disambiguation` - LLM fallback for ambiguous semantic scores
//! - `pipeline` - the full per-turn decision pipeline
//! - `config` - environment-driven tunables
//! - `error` - crate-local error type

pub mod config;
pub mod decision;
pub mod error;
pub mod grace;
pub mod llm_disambiguation;
pub mod pipeline;
pub mod route;
pub mod state;
pub mod telemetry;

pub use config::RouterConfig;
pub use decision::{threshold_check, RoutingDecision, ThresholdOutcome};
pub use error::{Result, RouterError};
pub use grace::{get_grace_period_status, is_within_grace_period, should_bypass_grace_period, GracePeriodStatus, GraceReason};
pub use llm_disambiguation::{disambiguate, DisambiguationResult};
pub use pipeline::{apply_manual_selection, route_turn, RoutingOutcome};
pub use route::{cosine_similarity, ScoredRoute, SemanticRouter, TriadRoute};
pub use state::{PendingIntent, RouterState, RouterStateStore};
pub use telemetry::{RoutingMethod, TelemetryLog, TelemetryRecord};

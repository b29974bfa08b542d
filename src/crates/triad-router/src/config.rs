//! Router configuration, loaded from `CLAUDE_ROUTER_*` environment variables.

use crate::error::Result;
use triad_support::config::{get_env_bool, get_env_or, get_env_parse_ranged};

/// Tunable router knobs. Every field has a documented default and, where the
/// external interfaces call out a valid range, `from_env` validates it.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub confidence_threshold: f64,
    pub ambiguity_threshold: f64,
    pub grace_turns: u32,
    pub grace_minutes: f64,
    pub llm_timeout_ms: u64,
    pub similarity_threshold: f64,
    pub training_mode: bool,
    pub telemetry_enabled: bool,
    pub model_path: Option<String>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.70,
            ambiguity_threshold: 0.10,
            grace_turns: 5,
            grace_minutes: 8.0,
            llm_timeout_ms: 2000,
            similarity_threshold: 0.70,
            training_mode: false,
            telemetry_enabled: true,
            model_path: None,
        }
    }
}

impl RouterConfig {
    /// Load configuration, falling back to defaults for anything unset.
    /// Numeric values outside their documented range are rejected rather
    /// than silently clamped.
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            confidence_threshold: get_env_parse_ranged(
                "CLAUDE_ROUTER_CONFIDENCE",
                defaults.confidence_threshold,
                0.0,
                1.0,
            )?,
            ambiguity_threshold: defaults.ambiguity_threshold,
            grace_turns: get_env_parse_ranged(
                "CLAUDE_ROUTER_GRACE_TURNS",
                defaults.grace_turns,
                1,
                1000,
            )?,
            grace_minutes: get_env_parse_ranged(
                "CLAUDE_ROUTER_GRACE_MINUTES",
                defaults.grace_minutes,
                0.0,
                1440.0,
            )?,
            llm_timeout_ms: get_env_parse_ranged(
                "CLAUDE_ROUTER_LLM_TIMEOUT",
                defaults.llm_timeout_ms,
                100,
                10_000,
            )?,
            similarity_threshold: get_env_parse_ranged(
                "CLAUDE_ROUTER_SIMILARITY_THRESHOLD",
                defaults.similarity_threshold,
                0.0,
                1.0,
            )?,
            training_mode: get_env_bool("CLAUDE_ROUTER_TRAINING")?.unwrap_or(defaults.training_mode),
            telemetry_enabled: get_env_bool("CLAUDE_ROUTER_TELEMETRY")?
                .unwrap_or(defaults.telemetry_enabled),
            model_path: {
                let v = get_env_or("CLAUDE_ROUTER_MODEL_PATH", "")?;
                if v.is_empty() {
                    None
                } else {
                    Some(v)
                }
            },
        })
    }
}

//! The router's per-turn decision pipeline.
//!
//! Preference order: explicit override, then an active grace period, then
//! high-confidence semantic routing, then LLM disambiguation, then asking
//! the user to pick manually, with cancellation available at any point.

use crate::decision::{threshold_check, RoutingDecision};
use crate::grace::{get_grace_period_status, should_bypass_grace_period};
use crate::llm_disambiguation::disambiguate;
use crate::route::{ScoredRoute, SemanticRouter};
use crate::state::RouterState;
use crate::telemetry::{RoutingMethod, TelemetryLog, TelemetryRecord};
use std::time::Instant;
use triad_llm::{ChatModel, Embedder};

const EXPLICIT_SWITCH_PREFIX: &str = "/switch-triad";
const CANCEL_COMMAND: &str = "/cancel-triad";

/// What the pipeline decided to do with a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum RoutingOutcome {
    /// Stayed in the currently active triad without re-routing.
    StayedInGracePeriod { triad: String },
    /// Routed (or re-routed) to a triad, by whatever method decided it.
    Routed {
        triad: String,
        method: RoutingMethod,
        confidence: f64,
    },
    /// Semantic routing was ambiguous and no LLM fallback is configured;
    /// the caller must ask the user to pick among `candidates`.
    NeedsManualSelection { candidates: Vec<ScoredRoute> },
    /// The active triad was explicitly cancelled.
    Cancelled,
}

fn parse_explicit_switch(prompt: &str) -> Option<String> {
    let trimmed = prompt.trim();
    trimmed
        .strip_prefix(EXPLICIT_SWITCH_PREFIX)
        .map(|rest| rest.trim().to_string())
        .filter(|id| !id.is_empty())
}

/// Run one turn of the pipeline against `prompt`, mutating `state` in
/// place and (when `telemetry` is given) recording the decision.
#[allow(clippy::too_many_arguments)]
pub async fn route_turn(
    state: &mut RouterState,
    confidence_threshold: f64,
    ambiguity_threshold: f64,
    grace_turns: u32,
    grace_minutes: f64,
    llm_timeout_ms: u64,
    router: &SemanticRouter,
    embedder: &dyn Embedder,
    chat_model: Option<&dyn ChatModel>,
    recent_turns: &[String],
    telemetry: Option<&TelemetryLog>,
    prompt: &str,
) -> RoutingOutcome {
    let started = Instant::now();

    if prompt.trim() == CANCEL_COMMAND {
        state.cancel();
        log_telemetry(telemetry, prompt, None, 0.0, RoutingMethod::Cancelled, started, false);
        return RoutingOutcome::Cancelled;
    }

    if let Some(target) = parse_explicit_switch(prompt) {
        state.activate(target.clone());
        log_telemetry(telemetry, prompt, Some(&target), 1.0, RoutingMethod::Manual, started, true);
        return RoutingOutcome::Routed {
            triad: target,
            method: RoutingMethod::Manual,
            confidence: 1.0,
        };
    }

    if let Some(active) = state.active_triad.clone() {
        let bypass = should_bypass_grace_period(prompt);
        let grace = get_grace_period_status(
            state.turn_count,
            state.last_activity,
            grace_turns,
            grace_minutes,
        );
        if grace.active && !bypass {
            state.record_turn();
            log_telemetry(
                telemetry,
                prompt,
                Some(&active),
                1.0,
                RoutingMethod::GracePeriod,
                started,
                false,
            );
            return RoutingOutcome::StayedInGracePeriod { triad: active };
        }
    }

    let scores = match router.route(prompt, embedder).await {
        Ok(scores) => scores,
        Err(_) => Vec::new(),
    };
    let outcome = threshold_check(&scores, confidence_threshold, ambiguity_threshold);

    match outcome.decision {
        RoutingDecision::RouteImmediately => {
            let top = outcome.candidates.into_iter().next().expect("route_immediately implies one candidate");
            state.activate(top.route_id.clone());
            log_telemetry(
                telemetry,
                prompt,
                Some(&top.route_id),
                top.score,
                RoutingMethod::Semantic,
                started,
                false,
            );
            RoutingOutcome::Routed {
                triad: top.route_id,
                method: RoutingMethod::Semantic,
                confidence: top.score,
            }
        }
        RoutingDecision::LlmFallbackRequired => {
            if outcome.candidates.is_empty() {
                log_telemetry(telemetry, prompt, None, 0.0, RoutingMethod::Manual, started, false);
                return RoutingOutcome::NeedsManualSelection { candidates: Vec::new() };
            }
            match chat_model {
                Some(model) => {
                    let result = disambiguate(
                        model,
                        prompt,
                        &outcome.candidates,
                        recent_turns,
                        llm_timeout_ms,
                    )
                    .await;
                    let confidence = outcome
                        .candidates
                        .iter()
                        .find(|c| c.route_id == result.triad_id)
                        .map(|c| c.score)
                        .unwrap_or(0.0);
                    state.activate(result.triad_id.clone());
                    log_telemetry(
                        telemetry,
                        prompt,
                        Some(&result.triad_id),
                        confidence,
                        RoutingMethod::Llm,
                        started,
                        result.fell_back,
                    );
                    RoutingOutcome::Routed {
                        triad: result.triad_id,
                        method: RoutingMethod::Llm,
                        confidence,
                    }
                }
                None => {
                    log_telemetry(telemetry, prompt, None, 0.0, RoutingMethod::Manual, started, false);
                    RoutingOutcome::NeedsManualSelection {
                        candidates: outcome.candidates,
                    }
                }
            }
        }
    }
}

/// Apply a user's manual pick after a prior turn returned
/// `NeedsManualSelection`. Manual selections are always recorded at full
/// confidence since they carry direct user intent.
pub fn apply_manual_selection(
    state: &mut RouterState,
    triad: impl Into<String>,
    telemetry: Option<&TelemetryLog>,
) -> RoutingOutcome {
    let triad = triad.into();
    state.activate(triad.clone());
    if let Some(log) = telemetry {
        let record = TelemetryRecord::new(
            "<manual selection>",
            Some(triad.clone()),
            1.0,
            RoutingMethod::Manual,
            0,
        );
        let _ = log.append(&record);
    }
    RoutingOutcome::Routed {
        triad,
        method: RoutingMethod::Manual,
        confidence: 1.0,
    }
}

#[allow(clippy::too_many_arguments)]
fn log_telemetry(
    telemetry: Option<&TelemetryLog>,
    prompt: &str,
    chosen: Option<&str>,
    confidence: f64,
    method: RoutingMethod,
    started: Instant,
    overridden: bool,
) {
    let Some(log) = telemetry else { return };
    let record = TelemetryRecord::new(
        prompt,
        chosen.map(|s| s.to_string()),
        confidence,
        method,
        started.elapsed().as_millis() as u64,
    )
    .with_overridden(overridden);
    let _ = log.append(&record);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::route::TriadRoute;
    use triad_llm::HashEmbedder;

    fn route(id: &str, description: &str) -> TriadRoute {
        TriadRoute {
            id: id.into(),
            name: id.into(),
            description: description.into(),
            example_prompts: vec![],
            keywords: vec![],
        }
    }

    async fn router() -> SemanticRouter {
        let embedder = HashEmbedder::default();
        SemanticRouter::load(
            vec![
                route("design", "system design and architecture review"),
                route("implementation", "writing code and implementing features"),
            ],
            &embedder,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_explicit_switch_overrides_everything() {
        let mut state = RouterState::new("sess-1");
        state.activate("implementation");
        let embedder = HashEmbedder::default();
        let r = router().await;
        let outcome = route_turn(
            &mut state, 0.70, 0.10, 5, 8.0, 2000, &r, &embedder, None, &[], None,
            "/switch-triad design",
        )
        .await;
        assert_eq!(
            outcome,
            RoutingOutcome::Routed {
                triad: "design".into(),
                method: RoutingMethod::Manual,
                confidence: 1.0,
            }
        );
        assert_eq!(state.active_triad.as_deref(), Some("design"));
    }

    #[tokio::test]
    async fn test_cancel_command_clears_state() {
        let mut state = RouterState::new("sess-1");
        state.activate("design");
        let embedder = HashEmbedder::default();
        let r = router().await;
        let outcome = route_turn(
            &mut state, 0.70, 0.10, 5, 8.0, 2000, &r, &embedder, None, &[], None,
            "/cancel-triad",
        )
        .await;
        assert_eq!(outcome, RoutingOutcome::Cancelled);
        assert!(state.active_triad.is_none());
    }

    #[tokio::test]
    async fn test_grace_period_keeps_active_triad() {
        let mut state = RouterState::new("sess-1");
        state.activate("design");
        let embedder = HashEmbedder::default();
        let r = router().await;
        let outcome = route_turn(
            &mut state, 0.70, 0.10, 5, 8.0, 2000, &r, &embedder, None, &[], None,
            "continue working on this",
        )
        .await;
        assert_eq!(outcome, RoutingOutcome::StayedInGracePeriod { triad: "design".into() });
        assert_eq!(state.turn_count, 2);
    }

    #[tokio::test]
    async fn test_strong_transition_phrase_bypasses_grace_period() {
        let mut state = RouterState::new("sess-1");
        state.activate("design");
        let embedder = HashEmbedder::default();
        let r = router().await;
        let outcome = route_turn(
            &mut state, 0.70, 0.10, 5, 8.0, 2000, &r, &embedder, None, &[], None,
            "now let's write the code for this feature",
        )
        .await;
        assert_ne!(outcome, RoutingOutcome::StayedInGracePeriod { triad: "design".into() });
    }

    #[tokio::test]
    async fn test_manual_selection_activates_triad() {
        let mut state = RouterState::new("sess-1");
        let outcome = apply_manual_selection(&mut state, "design", None);
        assert_eq!(state.active_triad.as_deref(), Some("design"));
        assert_eq!(
            outcome,
            RoutingOutcome::Routed {
                triad: "design".into(),
                method: RoutingMethod::Manual,
                confidence: 1.0,
            }
        );
    }
}

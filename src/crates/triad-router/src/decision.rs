//! Confidence/ambiguity threshold check over a ranked score list.

use crate::route::ScoredRoute;
use serde::{Deserialize, Serialize};

/// Whether a ranked score list is decisive enough to route immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingDecision {
    RouteImmediately,
    LlmFallbackRequired,
}

/// Outcome of the threshold check: the decision plus however many
/// candidates are relevant to it (one when routing immediately, up to three
/// when falling back to the LLM).
#[derive(Debug, Clone)]
pub struct ThresholdOutcome {
    pub decision: RoutingDecision,
    pub candidates: Vec<ScoredRoute>,
}

/// Apply the confidence/ambiguity thresholds to a ranked score list.
///
/// Routes immediately when the top score meets `confidence_threshold` *and*
/// leads the runner-up by at least `ambiguity_threshold` (both inclusive
/// boundaries — exactly-met thresholds route). Otherwise escalates to LLM
/// disambiguation with the top three candidates.
pub fn threshold_check(
    scores: &[ScoredRoute],
    confidence_threshold: f64,
    ambiguity_threshold: f64,
) -> ThresholdOutcome {
    let Some(top) = scores.first() else {
        return ThresholdOutcome {
            decision: RoutingDecision::LlmFallbackRequired,
            candidates: Vec::new(),
        };
    };
    let second_score = scores.get(1).map(|s| s.score).unwrap_or(f64::MIN);
    let gap = top.score - second_score;

    if top.score >= confidence_threshold && gap >= ambiguity_threshold {
        ThresholdOutcome {
            decision: RoutingDecision::RouteImmediately,
            candidates: vec![top.clone()],
        }
    } else {
        ThresholdOutcome {
            decision: RoutingDecision::LlmFallbackRequired,
            candidates: scores.iter().take(3).cloned().collect(),
        }
    }
}

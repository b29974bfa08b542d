//! LLM-backed disambiguation for prompts semantic routing couldn't decide.

use crate::route::ScoredRoute;
use std::time::Duration;
use tracing::{debug, warn};
use triad_llm::{ChatModel, ChatRequest, LlmError, Message};

/// Retry schedule for a transient transport failure.
const TRANSIENT_BACKOFF_MS: &[u64] = &[500, 1000];
/// Retry schedule for a rate-limit response.
const RATE_LIMIT_BACKOFF_MS: &[u64] = &[1000, 2000];

/// The result of asking an LLM to pick among ambiguous candidates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisambiguationResult {
    pub triad_id: String,
    pub reasoning: Option<String>,
    /// `true` when the model's answer had to be salvaged (substring match
    /// or highest-scoring fallback) rather than parsed cleanly.
    pub fell_back: bool,
}

fn build_prompt(prompt: &str, candidates: &[ScoredRoute], recent_turns: &[String]) -> String {
    let mut body = String::new();
    if !recent_turns.is_empty() {
        body.push_str("Recent conversation:\n");
        for turn in recent_turns {
            body.push_str("- ");
            body.push_str(turn);
            body.push('\n');
        }
        body.push('\n');
    }
    body.push_str("The user said: \"");
    body.push_str(prompt);
    body.push_str("\"\n\nCandidate triads:\n");
    for candidate in candidates {
        body.push_str(&format!("- {} (score {:.3})\n", candidate.route_id, candidate.score));
    }
    body.push_str(
        "\nReply with the chosen triad id alone on the first line, \
         then optionally explain your reasoning on the following lines.",
    );
    body
}

/// Parse a model response: first line is the triad id, remainder (if any)
/// is reasoning. Falls back to a substring match against known candidate
/// ids, and finally to the highest-scoring candidate, if the first line
/// doesn't match any candidate exactly.
fn parse_response(content: &str, candidates: &[ScoredRoute]) -> Option<DisambiguationResult> {
    let mut lines = content.lines();
    let first_line = lines.next()?.trim();
    let reasoning: String = lines.collect::<Vec<_>>().join("\n").trim().to_string();
    let reasoning = if reasoning.is_empty() { None } else { Some(reasoning) };

    if let Some(exact) = candidates.iter().find(|c| c.route_id == first_line) {
        return Some(DisambiguationResult {
            triad_id: exact.route_id.clone(),
            reasoning,
            fell_back: false,
        });
    }

    let lower = content.to_lowercase();
    if let Some(substring_match) = candidates.iter().find(|c| lower.contains(&c.route_id.to_lowercase())) {
        return Some(DisambiguationResult {
            triad_id: substring_match.route_id.clone(),
            reasoning,
            fell_back: true,
        });
    }

    candidates.first().map(|top| DisambiguationResult {
        triad_id: top.route_id.clone(),
        reasoning,
        fell_back: true,
    })
}

/// Ask `model` to disambiguate among `candidates` for `prompt`, retrying
/// transient and rate-limit failures on their respective backoff
/// schedules. Auth failures never retry. If every attempt fails, falls
/// back to the highest-scoring candidate.
pub async fn disambiguate(
    model: &dyn ChatModel,
    prompt: &str,
    candidates: &[ScoredRoute],
    recent_turns: &[String],
    timeout_ms: u64,
) -> DisambiguationResult {
    let body = build_prompt(prompt, candidates, recent_turns);
    let request = ChatRequest::new(vec![
        Message::system(
            "You resolve ambiguous routing decisions between candidate triads. \
             Answer with only the triad id on the first line.",
        ),
        Message::human(body),
    ])
    .with_temperature(0.0);

    let mut attempt = 0usize;
    loop {
        let call = tokio::time::timeout(
            Duration::from_millis(timeout_ms),
            model.chat(request.clone()),
        )
        .await;

        let outcome = match call {
            Ok(result) => result,
            Err(_) => Err(LlmError::Unavailable("request timed out".to_string())),
        };

        match outcome {
            Ok(response) => {
                if let Some(result) = parse_response(&response.message.content, candidates) {
                    return result;
                }
                warn!("LLM disambiguation response was unparseable, falling back");
                return fallback(candidates);
            }
            Err(e) => {
                let backoff = match &e {
                    LlmError::Auth(_) => None,
                    LlmError::RateLimited(_) => RATE_LIMIT_BACKOFF_MS.get(attempt).copied(),
                    _ if e.is_retryable() => TRANSIENT_BACKOFF_MS.get(attempt).copied(),
                    _ => None,
                };
                match backoff {
                    Some(ms) => {
                        debug!(attempt, delay_ms = ms, error = %e, "retrying LLM disambiguation");
                        tokio::time::sleep(Duration::from_millis(ms)).await;
                        attempt += 1;
                    }
                    None => {
                        warn!(error = %e, "LLM disambiguation failed, falling back to top candidate");
                        return fallback(candidates);
                    }
                }
            }
        }
    }
}

fn fallback(candidates: &[ScoredRoute]) -> DisambiguationResult {
    match candidates.first() {
        Some(top) => DisambiguationResult {
            triad_id: top.route_id.clone(),
            reasoning: None,
            fell_back: true,
        },
        None => DisambiguationResult {
            triad_id: String::new(),
            reasoning: None,
            fell_back: true,
        },
    }
}

//! Grace-period state machine.
//!
//! Grounded on the original `grace_period.py`: a triad stays active without
//! re-routing until either the turn budget or the time budget expires,
//! unless the user explicitly signals they want to switch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use triad_support::time::minutes_between;

const STRONG_TRANSITION_PHRASES: &[&str] = &[
    "let's switch to",
    "let's move to",
    "now let's",
    "can we switch to",
    "i want to switch to",
];

const MULTI_INTENT_CONNECTORS: &[&str] = &[" and then ", " then "];

const EXPLICIT_SWITCH_PREFIX: &str = "/switch-triad";

/// Why a grace period is (or isn't) active, for diagnostics/telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraceReason {
    Both,
    Turns,
    Time,
    None,
}

/// A snapshot of the grace-period check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GracePeriodStatus {
    pub active: bool,
    pub turns_remaining: i64,
    pub minutes_remaining: f64,
    pub reason: GraceReason,
}

/// Whether `turn_count` / `last_activity` still fall within the grace
/// window for `grace_turns`/`grace_minutes`.
pub fn is_within_grace_period(
    turn_count: u32,
    last_activity: Option<DateTime<Utc>>,
    grace_turns: u32,
    grace_minutes: f64,
) -> bool {
    get_grace_period_status(turn_count, last_activity, grace_turns, grace_minutes).active
}

/// Full grace-period status, including which clock (turns, time, both, or
/// neither) is keeping the grace period alive.
pub fn get_grace_period_status(
    turn_count: u32,
    last_activity: Option<DateTime<Utc>>,
    grace_turns: u32,
    grace_minutes: f64,
) -> GracePeriodStatus {
    let within_turns = turn_count < grace_turns;
    let turns_remaining = grace_turns as i64 - turn_count as i64;

    let (within_time, minutes_remaining) = match last_activity {
        Some(last) => {
            let elapsed = minutes_between(&last, &Utc::now());
            (elapsed < grace_minutes, (grace_minutes - elapsed).max(0.0))
        }
        None => (false, 0.0),
    };

    let reason = match (within_turns, within_time) {
        (true, true) => GraceReason::Both,
        (true, false) => GraceReason::Turns,
        (false, true) => GraceReason::Time,
        (false, false) => GraceReason::None,
    };

    GracePeriodStatus {
        active: within_turns || within_time,
        turns_remaining: turns_remaining.max(0),
        minutes_remaining,
        reason,
    }
}

/// Whether `prompt` explicitly asks to bypass an active grace period.
pub fn should_bypass_grace_period(prompt: &str) -> bool {
    let trimmed = prompt.trim();
    if trimmed.starts_with(EXPLICIT_SWITCH_PREFIX) {
        return true;
    }
    let lower = trimmed.to_lowercase();
    if STRONG_TRANSITION_PHRASES.iter().any(|p| lower.contains(p)) {
        return true;
    }
    if MULTI_INTENT_CONNECTORS.iter().any(|c| lower.contains(c)) {
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_within_turn_budget() {
        assert!(is_within_grace_period(2, Some(Utc::now()), 5, 8.0));
    }

    #[test]
    fn test_turn_budget_exhausted_but_time_still_fresh() {
        let status = get_grace_period_status(5, Some(Utc::now()), 5, 8.0);
        assert!(status.active);
        assert_eq!(status.reason, GraceReason::Time);
    }

    #[test]
    fn test_both_budgets_exhausted() {
        let old = Utc::now() - Duration::minutes(30);
        let status = get_grace_period_status(10, Some(old), 5, 8.0);
        assert!(!status.active);
        assert_eq!(status.reason, GraceReason::None);
    }

    #[test]
    fn test_no_last_activity_relies_on_turns_only() {
        let status = get_grace_period_status(1, None, 5, 8.0);
        assert!(status.active);
        assert_eq!(status.reason, GraceReason::Turns);
    }

    #[test]
    fn test_explicit_switch_command_bypasses() {
        assert!(should_bypass_grace_period("/switch-triad design"));
    }

    #[test]
    fn test_strong_transition_phrase_bypasses() {
        assert!(should_bypass_grace_period("Now let's focus on deployment"));
    }

    #[test]
    fn test_multi_intent_connector_bypasses() {
        assert!(should_bypass_grace_period("finish this and then start the release"));
    }

    #[test]
    fn test_ordinary_prompt_does_not_bypass() {
        assert!(!should_bypass_grace_period("validate this idea further"));
    }
}

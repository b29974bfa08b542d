//! Enforcement-mode semantics: turning a `ValidationResult` into an
//! allow/block decision, and the deviation record (if any) to persist.

use crate::instance::Deviation;
use crate::schema::EnforcementMode;
use crate::validate::ValidationResult;
use triad_support::time::now;

const EMERGENCY_OVERRIDE_MIN_REASON_LEN: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviationType {
    SkipForward,
    SkipBackward,
    GateSkip,
    EmergencyOverride,
}

impl DeviationType {
    fn as_str(&self) -> &'static str {
        match self {
            DeviationType::SkipForward => "skip_forward",
            DeviationType::SkipBackward => "skip_backward",
            DeviationType::GateSkip => "gate_skip",
            DeviationType::EmergencyOverride => "emergency_override",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EnforcementResult {
    pub allowed: bool,
    pub message: String,
    pub requires_reason: bool,
    pub deviation: Option<Deviation>,
}

pub struct Enforcer;

impl Enforcer {
    pub fn new() -> Self {
        Self
    }

    /// Decides whether `requested_triad` may proceed given a prior
    /// validation result, an optional reason, and whether the caller
    /// invoked a forced/emergency skip.
    pub fn enforce(
        &self,
        validation: &ValidationResult,
        from_triad: Option<&str>,
        requested_triad: &str,
        reason: Option<&str>,
        force_skip: bool,
    ) -> EnforcementResult {
        if validation.violations.is_empty() && validation.warnings.is_empty() {
            return EnforcementResult {
                allowed: true,
                message: "transition permitted".to_string(),
                requires_reason: false,
                deviation: None,
            };
        }

        let deviation_type = self.classify(validation);
        let reason_trimmed = reason.unwrap_or("").trim();

        match validation.enforcement_mode {
            EnforcementMode::Strict => {
                if force_skip && reason_trimmed.len() >= EMERGENCY_OVERRIDE_MIN_REASON_LEN {
                    EnforcementResult {
                        allowed: true,
                        message: format!(
                            "emergency override accepted for '{requested_triad}'"
                        ),
                        requires_reason: true,
                        deviation: Some(self.build_deviation(
                            DeviationType::EmergencyOverride,
                            from_triad,
                            requested_triad,
                            validation,
                            reason_trimmed,
                        )),
                    }
                } else {
                    EnforcementResult {
                        allowed: false,
                        message: format!(
                            "🛑 CRITICAL: STRICT workflow enforcement blocks '{requested_triad}': {}",
                            validation.violations.join("; ")
                        ),
                        requires_reason: true,
                        deviation: None,
                    }
                }
            }
            EnforcementMode::Recommended => {
                if reason_trimmed.is_empty() {
                    EnforcementResult {
                        allowed: false,
                        message: format!(
                            "'{requested_triad}' deviates from the recommended workflow; provide a reason to proceed"
                        ),
                        requires_reason: true,
                        deviation: None,
                    }
                } else {
                    EnforcementResult {
                        allowed: true,
                        message: format!("proceeding to '{requested_triad}' with recorded deviation"),
                        requires_reason: true,
                        deviation: Some(self.build_deviation(
                            deviation_type,
                            from_triad,
                            requested_triad,
                            validation,
                            reason_trimmed,
                        )),
                    }
                }
            }
            EnforcementMode::Optional => EnforcementResult {
                allowed: true,
                message: format!("proceeding to '{requested_triad}'"),
                requires_reason: false,
                deviation: if validation.skipped_triads.is_empty() {
                    None
                } else {
                    Some(self.build_deviation(
                        deviation_type,
                        from_triad,
                        requested_triad,
                        validation,
                        reason_trimmed,
                    ))
                },
            },
        }
    }

    fn classify(&self, validation: &ValidationResult) -> DeviationType {
        if validation.required_triad.is_some() {
            DeviationType::GateSkip
        } else if validation
            .warnings
            .iter()
            .any(|w| w.to_lowercase().contains("backward"))
        {
            DeviationType::SkipBackward
        } else {
            DeviationType::SkipForward
        }
    }

    fn build_deviation(
        &self,
        deviation_type: DeviationType,
        from_triad: Option<&str>,
        to_triad: &str,
        validation: &ValidationResult,
        reason: &str,
    ) -> Deviation {
        Deviation {
            deviation_type: deviation_type.as_str().to_string(),
            from_triad: from_triad.map(|s| s.to_string()),
            to_triad: to_triad.to_string(),
            skipped: validation.skipped_triads.clone(),
            reason: reason.to_string(),
            user: None,
            timestamp: now(),
        }
    }
}

impl Default for Enforcer {
    fn default() -> Self {
        Self::new()
    }
}

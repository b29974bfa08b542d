//! Environment variable loading utilities.
//!
//! Mirrors the numeric-range validation the router and hook components need
//! for the `CLAUDE_ROUTER_*` / `TRIADS_*` environment variables documented in
//! the external interfaces spec: values outside a documented range are
//! rejected rather than silently clamped.

use crate::{Result, SupportError};
use std::env;
use std::str::FromStr;

/// Load an environment variable as a string.
pub fn get_env(key: &str) -> Result<Option<String>> {
    match env::var(key) {
        Ok(val) => Ok(Some(val)),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => Err(SupportError::InvalidEnv {
            key: key.to_string(),
            reason: "contains invalid UTF-8".to_string(),
        }),
    }
}

/// Load and parse an environment variable.
pub fn get_env_parse<T>(key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match get_env(key)? {
        Some(val) => {
            let parsed = val.parse::<T>().map_err(|e| SupportError::InvalidEnv {
                key: key.to_string(),
                reason: e.to_string(),
            })?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

/// Load an environment variable with a default value.
pub fn get_env_or(key: &str, default: impl Into<String>) -> Result<String> {
    Ok(get_env(key)?.unwrap_or_else(|| default.into()))
}

/// Load and parse an environment variable with a default value.
pub fn get_env_parse_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    Ok(get_env_parse(key)?.unwrap_or(default))
}

/// Load and parse an environment variable, clamping/validating it to an
/// inclusive numeric range. Used for knobs like the LLM timeout (100-10000ms)
/// and confidence thresholds (0.0-1.0) called out in the router config.
pub fn get_env_parse_ranged<T>(key: &str, default: T, min: T, max: T) -> Result<T>
where
    T: FromStr + PartialOrd + Copy + std::fmt::Display,
    T::Err: std::fmt::Display,
{
    let value = get_env_parse(key)?.unwrap_or(default);
    if value < min || value > max {
        return Err(SupportError::InvalidEnv {
            key: key.to_string(),
            reason: format!("{} out of range [{}, {}]", value, min, max),
        });
    }
    Ok(value)
}

/// Load a boolean environment variable.
///
/// Recognizes `true`/`1`/`yes`/`on` and `false`/`0`/`no`/`off` (case
/// insensitive); absence is `None`, not `false`, so callers decide the
/// default.
pub fn get_env_bool(key: &str) -> Result<Option<bool>> {
    match get_env(key)? {
        Some(val) => {
            let lower = val.to_lowercase();
            match lower.as_str() {
                "true" | "1" | "yes" | "on" => Ok(Some(true)),
                "false" | "0" | "no" | "off" => Ok(Some(false)),
                _ => Err(SupportError::InvalidEnv {
                    key: key.to_string(),
                    reason: format!("not a recognized boolean: {}", val),
                }),
            }
        }
        None => Ok(None),
    }
}

/// Convenience: a boolean flag environment variable that defaults to unset
/// (`false`) and treats any parse failure as unset rather than propagating
/// an error; used for hook-side flags where "fail open" is the safety rule.
pub fn flag_set(key: &str) -> bool {
    get_env_bool(key).ok().flatten().unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize the tests that
    // mutate them so parallel execution doesn't interleave.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_get_env_missing() {
        let _g = ENV_LOCK.lock().unwrap();
        assert_eq!(get_env("TRIAD_TEST_MISSING_VAR").unwrap(), None);
    }

    #[test]
    fn test_get_env_or_default() {
        let _g = ENV_LOCK.lock().unwrap();
        assert_eq!(
            get_env_or("TRIAD_TEST_MISSING_VAR", "fallback").unwrap(),
            "fallback"
        );
    }

    #[test]
    fn test_get_env_parse_ranged_in_bounds() {
        let _g = ENV_LOCK.lock().unwrap();
        env::set_var("TRIAD_TEST_THRESHOLD", "0.8");
        let v: f64 = get_env_parse_ranged("TRIAD_TEST_THRESHOLD", 0.7, 0.0, 1.0).unwrap();
        assert!((v - 0.8).abs() < f64::EPSILON);
        env::remove_var("TRIAD_TEST_THRESHOLD");
    }

    #[test]
    fn test_get_env_parse_ranged_out_of_bounds() {
        let _g = ENV_LOCK.lock().unwrap();
        env::set_var("TRIAD_TEST_THRESHOLD_BAD", "1.5");
        let result: Result<f64> =
            get_env_parse_ranged("TRIAD_TEST_THRESHOLD_BAD", 0.7, 0.0, 1.0);
        assert!(result.is_err());
        env::remove_var("TRIAD_TEST_THRESHOLD_BAD");
    }

    #[test]
    fn test_get_env_bool_variants() {
        let _g = ENV_LOCK.lock().unwrap();
        for (value, expected) in [
            ("true", true),
            ("1", true),
            ("yes", true),
            ("on", true),
            ("false", false),
            ("0", false),
            ("no", false),
            ("off", false),
        ] {
            env::set_var("TRIAD_TEST_BOOL", value);
            assert_eq!(get_env_bool("TRIAD_TEST_BOOL").unwrap(), Some(expected));
        }
        env::remove_var("TRIAD_TEST_BOOL");
    }

    #[test]
    fn test_flag_set_defaults_false_on_missing() {
        let _g = ENV_LOCK.lock().unwrap();
        assert!(!flag_set("TRIAD_TEST_MISSING_FLAG"));
    }

    #[test]
    fn test_flag_set_true() {
        let _g = ENV_LOCK.lock().unwrap();
        env::set_var("TRIAD_TEST_FLAG", "1");
        assert!(flag_set("TRIAD_TEST_FLAG"));
        env::remove_var("TRIAD_TEST_FLAG");
    }
}

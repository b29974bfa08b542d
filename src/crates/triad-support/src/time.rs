//! UTC timestamp helpers.
//!
//! Every timestamp persisted by the runtime (graph node/link timestamps,
//! workflow instance records, router telemetry) is UTC with an explicit `Z`
//! offset; naive datetimes are never written to disk or compared against
//! each other, since a mix of naive and zoned clocks is how grace-period and
//! deviation-duration math goes silently wrong.

use chrono::{DateTime, Utc};

/// The current UTC instant, truncated to millisecond precision so two calls
/// in the same process round-trip identically through JSON.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Render a timestamp in RFC 3339 with an explicit `Z` suffix (not `+00:00`),
/// matching the format the instance manager and graph store persist.
pub fn to_rfc3339(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

/// Parse an RFC 3339 timestamp, accepting both `Z` and `+00:00` suffixes.
pub fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Minutes elapsed between two timestamps, `to - from`, negative if `to`
/// precedes `from`. Used by the router's grace-period clock and by workflow
/// deviation duration tracking.
pub fn minutes_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    (to.signed_duration_since(*from)).num_milliseconds() as f64 / 60_000.0
}

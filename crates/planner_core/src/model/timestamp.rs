//! Timestamp conversion at the LLM boundary.
//!
//! Storage keeps epoch milliseconds; prompts and tool arguments use the fixed
//! human format below, interpreted as UTC.

use chrono::{DateTime, NaiveDateTime, Utc};

/// Text format used in prompts and accepted from tool arguments.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current wall clock in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Renders epoch milliseconds with [`TIMESTAMP_FORMAT`].
pub fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(epoch_ms)
        .map(|value| value.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| epoch_ms.to_string())
}

/// Parses a [`TIMESTAMP_FORMAT`] string into epoch milliseconds.
///
/// A trailing fractional part or a `T` separator is tolerated because models
/// occasionally emit ISO-8601 instead of the requested format.
pub fn parse_timestamp(value: &str) -> Result<i64, String> {
    let trimmed = value.trim();
    let parsed = NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .map_err(|err| format!("invalid timestamp `{trimmed}`: {err}"))?;
    Ok(parsed.and_utc().timestamp_millis())
}

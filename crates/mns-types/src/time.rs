use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::TypeError;

/// Encode a timestamp as RFC 3339 UTC with nanosecond precision.
///
/// The output is fixed-width (`2026-10-19T12:00:00.000000000Z`) so that the
/// same instant always produces the same bytes.
pub fn format_timestamp(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Decode an RFC 3339 timestamp, normalising any offset to UTC.
pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, TypeError> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| TypeError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })
}

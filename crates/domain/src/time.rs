//! Time and timestamp helpers.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};

/// UTC timestamp carried by every reading.
pub type Timestamp = DateTime<Utc>;

/// Parse an RFC 3339 string into a UTC [`Timestamp`].
///
/// # Errors
///
/// Returns the underlying [`chrono::ParseError`] when `value` is not a
/// valid RFC 3339 timestamp.
pub fn parse_rfc3339(value: &str) -> Result<Timestamp, chrono::ParseError> {
    DateTime::parse_from_rfc3339(value).map(|dt| dt.to_utc())
}

/// Format a timestamp as fixed-width RFC 3339 with nanosecond precision.
///
/// Every value has the same length, so lexical order equals chronological
/// order. Storage adapters rely on this for range predicates.
#[must_use]
pub fn to_sortable_rfc3339(ts: Timestamp) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Whether `ts` is one of the "unset" instants a producer sends when it
/// has no real clock value: the Unix epoch or the calendar zero instant
/// (`0001-01-01T00:00:00Z`).
#[must_use]
pub fn is_unset(ts: Timestamp) -> bool {
    ts == DateTime::<Utc>::UNIX_EPOCH || ts == calendar_zero()
}

fn calendar_zero() -> Timestamp {
    NaiveDate::from_ymd_opt(1, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map_or(DateTime::<Utc>::MIN_UTC, |naive| naive.and_utc())
}

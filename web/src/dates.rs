//! Date parsing for request bodies and query strings.
//!
//! Accepted forms, all interpreted as UTC unless they carry an offset:
//! RFC 3339 (`2025-06-01T19:30:00+02:00`), a naive date-time with `T` or a
//! space (`2025-06-01T19:30:00`, optional fraction), and a bare date
//! (`2025-06-01`, midnight).
//!
//! Responses write dates as ISO-8601 UTC with millisecond precision
//! (`2025-06-01T17:30:00.000Z`).

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::Serializer;

const NAIVE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

/// Parse a client-supplied date. Returns `None` when no accepted form matches.
#[must_use]
pub fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }

    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Serialize a timestamp with millisecond precision and a `Z` suffix.
///
/// # Errors
///
/// Propagates the serializer's error.
pub fn serialize_millis<S: Serializer>(date: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// [`serialize_millis`] for an optional timestamp; `None` becomes `null`.
///
/// # Errors
///
/// Propagates the serializer's error.
#[allow(clippy::ref_option)]
pub fn serialize_opt_millis<S: Serializer>(
    date: &Option<DateTime<Utc>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => serialize_millis(date, serializer),
        None => serializer.serialize_none(),
    }
}

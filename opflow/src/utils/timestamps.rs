//! UTC timestamp helpers.

use chrono::{DateTime, SecondsFormat, Utc};

/// A UTC timestamp; serializes as RFC 3339.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Returns the current UTC time as RFC 3339 text with microseconds,
/// e.g. `2024-05-01T12:00:00.000000+00:00`.
#[must_use]
pub fn iso_timestamp() -> String {
    format_iso8601(&now_utc())
}

/// Formats a timestamp the way [`iso_timestamp`] does.
#[must_use]
pub fn format_iso8601(dt: &Timestamp) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

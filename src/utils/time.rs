//! Date normalization and timestamp helpers.
//!
//! The export API only accepts RFC3339 bounds, while people type dates like
//! `2025-04-01` or `2025/04/01`. [`normalize_date`] bridges the two without
//! ever failing: anything it does not recognize is passed through and left
//! for filter validation to reject.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;

/// Normalize a user-supplied date into an RFC3339 timestamp.
///
/// - Input with a time component (`T` present): `/` becomes `-` and a
///   trailing `Z` is ensured.
/// - `YYYY-MM-DD` or `YYYY/MM/DD`: `T00:00:00Z` is appended for a start
///   bound, `T23:59:59Z` for an end bound, so a pair of calendar dates covers
///   both days completely.
/// - Anything else is returned unchanged.
///
/// # Examples
///
/// ```
/// use dpod_audit_tools::utils::time::normalize_date;
///
/// assert_eq!(normalize_date("2025/04/01", true), "2025-04-01T00:00:00Z");
/// assert_eq!(normalize_date("2025-04-01", false), "2025-04-01T23:59:59Z");
/// assert_eq!(normalize_date("2025-04-01T10:00:00", true), "2025-04-01T10:00:00Z");
/// ```
pub fn normalize_date(input: &str, is_start: bool) -> String {
    if input.is_empty() {
        return String::new();
    }

    if input.contains('T') {
        let mut normalized = input.replace('/', "-");
        if !normalized.ends_with('Z') {
            normalized.push('Z');
        }
        return normalized;
    }

    if is_calendar_date(input) {
        let time = if is_start { "T00:00:00Z" } else { "T23:59:59Z" };
        return format!("{}{}", input.replace('/', "-"), time);
    }

    input.to_string()
}

/// `YYYY-MM-DD` or `YYYY/MM/DD` by shape only; range checks are the API's job.
fn is_calendar_date(input: &str) -> bool {
    let bytes = input.as_bytes();
    if bytes.len() != 10 {
        return false;
    }
    let sep = bytes[4];
    (sep == b'-' || sep == b'/')
        && bytes[7] == sep
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

/// Default export window: the seven days ending now.
pub fn default_window(now: DateTime<Utc>) -> (String, String) {
    let start = now - Duration::days(7);
    (export_timestamp(&start), export_timestamp(&now))
}

/// Format an instant at whole-second precision with a fixed `.000Z` suffix.
pub fn export_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S.000Z").to_string()
}

/// Parse an RFC3339 timestamp from an audit record
pub fn parse_timestamp(ts: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .context("Failed to parse timestamp")
        .map(|dt| dt.with_timezone(&Utc))
}

/// Order two record timestamps.
///
/// Compares parsed instants when both sides are valid RFC3339 so that
/// differing fractional precision or offsets do not skew the result, and
/// falls back to plain string ordering otherwise.
pub fn compare_timestamps(a: &str, b: &str) -> Ordering {
    match (parse_timestamp(a), parse_timestamp(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// Calculate duration between two timestamps in human-readable format
pub fn duration_human(start: &DateTime<Utc>, end: &DateTime<Utc>) -> String {
    let duration = end.signed_duration_since(*start);
    let seconds = duration.num_seconds();

    if seconds < 60 {
        format!("{} seconds", seconds)
    } else if seconds < 3600 {
        format!("{} minutes", seconds / 60)
    } else if seconds < 86400 {
        format!("{:.1} hours", seconds as f64 / 3600.0)
    } else {
        format!("{:.1} days", seconds as f64 / 86400.0)
    }
}

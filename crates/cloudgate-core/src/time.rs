//! Time handling for tool arguments and backend queries.
//!
//! This module provides [`parse_instant`] for turning caller-supplied date/time
//! text into timezone-aware instants, and [`TimeWindow`] for defining query
//! ranges.

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Formats carrying an explicit UTC offset.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%d %H:%M:%S%z",
];

/// Formats without an offset; interpreted in the caller's timezone.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S",
    "%Y/%m/%d %H:%M",
];

/// Date-only formats; interpreted as local midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%Y/%m/%d"];

/// Errors produced while parsing date/time text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeParseError {
    /// The input was empty or whitespace.
    #[error("empty date/time value")]
    Empty,

    /// The input did not match any supported format.
    #[error("unrecognized date/time '{0}'")]
    Unrecognized(String),

    /// The input names a local time skipped by a DST transition.
    #[error("'{0}' does not exist in the local timezone")]
    NonExistent(String),
}

/// Parses date/time text into a UTC instant, resolving naive values in the
/// system's local timezone.
///
/// Accepted inputs include RFC 3339 (`2025-02-05T10:00:00Z`,
/// `2025-02-05T10:00:00+01:00`), RFC 2822, naive ISO-8601 datetimes
/// (`2025-02-05T10:00`, `2025-02-05 10:00:00`) and bare dates (`2025-02-05`).
pub fn parse_instant(text: &str) -> Result<DateTime<Utc>, TimeParseError> {
    parse_instant_in(text, &Local)
}

/// Same as [`parse_instant`] but resolves naive values in `tz`.
pub fn parse_instant_in<Tz: TimeZone>(
    text: &str,
    tz: &Tz,
) -> Result<DateTime<Utc>, TimeParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(TimeParseError::Empty);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(text, fmt) {
            return Ok(dt.with_timezone(&Utc));
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc2822(text) {
        return Ok(dt.with_timezone(&Utc));
    }

    // A trailing Z on an otherwise naive value means UTC.
    if let Some(stripped) = text.strip_suffix('Z').or_else(|| text.strip_suffix('z')) {
        for fmt in NAIVE_FORMATS {
            if let Ok(naive) = NaiveDateTime::parse_from_str(stripped, fmt) {
                return Ok(Utc.from_utc_datetime(&naive));
            }
        }
    }

    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, fmt) {
            return resolve_local(text, &naive, tz);
        }
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt)
            && let Some(midnight) = date.and_hms_opt(0, 0, 0)
        {
            return resolve_local(text, &midnight, tz);
        }
    }

    Err(TimeParseError::Unrecognized(text.to_string()))
}

fn resolve_local<Tz: TimeZone>(
    text: &str,
    naive: &NaiveDateTime,
    tz: &Tz,
) -> Result<DateTime<Utc>, TimeParseError> {
    tz.from_local_datetime(naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| TimeParseError::NonExistent(text.to_string()))
}

/// A time window for querying calendar events.
///
/// Represents a half-open interval `[start, end)` in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Start of the window (inclusive).
    pub start: DateTime<Utc>,
    /// End of the window (exclusive).
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Creates a new time window.
    ///
    /// # Panics
    ///
    /// Panics if `start` is after `end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        assert!(start <= end, "TimeWindow start must be <= end");
        Self { start, end }
    }

    /// Creates a time window, returning `None` when `start` is after `end`.
    pub fn checked(start: DateTime<Utc>, end: DateTime<Utc>) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// Creates a window of `days` on each side of `center`.
    pub fn around(center: DateTime<Utc>, days: i64) -> Self {
        let span = Duration::days(days.abs());
        Self::new(center - span, center + span)
    }

    /// Checks if a datetime falls within this window.
    ///
    /// Uses half-open interval semantics: `[start, end)`.
    pub fn contains(&self, dt: DateTime<Utc>) -> bool {
        self.start <= dt && dt < self.end
    }

    /// Checks if an interval overlaps with this window.
    ///
    /// Zero-length intervals overlap when their instant lies inside the window.
    pub fn overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        if start == end {
            return self.contains(start);
        }
        start < self.end && end > self.start
    }
}

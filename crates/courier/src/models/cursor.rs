//! Cursor model for per-channel sync positions

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Position marker delimiting already-processed items from new ones.
///
/// Held as a decimal string with microsecond precision (e.g.
/// `"1712345678.123456"`) so it compares equal to the upstream item
/// timestamps it is derived from. Ordering between cursors is numeric,
/// never lexicographic.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value in seconds since the epoch.
    ///
    /// A malformed cursor parses to 0.0 and therefore orders before any
    /// real position.
    pub fn seconds(&self) -> f64 {
        self.0.parse().unwrap_or(0.0)
    }

    /// Strict numeric ordering. This is the comparison the monotonic
    /// cursor-update rule is defined over.
    pub fn is_after(&self, other: &Cursor) -> bool {
        self.seconds() > other.seconds()
    }

    /// Build a cursor from a wall-clock instant, formatted with exactly
    /// six decimal places.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(format!("{}.{:06}", at.timestamp(), at.timestamp_subsec_micros()))
    }

    /// Wall-clock age of the position this cursor points at.
    ///
    /// Malformed cursors resolve to the epoch and report an enormous age,
    /// which routes them into the staleness fallback.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        let at = Utc
            .timestamp_millis_opt((self.seconds() * 1000.0) as i64)
            .single()
            .unwrap_or(DateTime::UNIX_EPOCH);
        now - at
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Cursor {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Cursor {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

//! # Temporal Types: UTC-Only Timestamps and Clocks
//!
//! Defines `Timestamp`, a UTC timestamp truncated to seconds, and the
//! [`Clock`] seam through which every component reads the current time.
//!
//! ## Security Invariant
//!
//! Freshness checks compare whole seconds. Reading the clock can fail
//! (a system time before the Unix epoch); callers treat that as fatal for
//! the current operation rather than retrying.

use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ClockError;

/// A UTC-only timestamp, truncated to seconds precision.
///
/// Serializes as RFC 3339 with a `Z` suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Create a timestamp from Unix seconds.
    pub fn from_unix(secs: i64) -> Option<Self> {
        DateTime::<Utc>::from_timestamp(secs, 0).map(Self)
    }

    /// Parse an RFC 3339 timestamp with any UTC offset, converting to UTC.
    ///
    /// Sub-second digits are accepted and truncated.
    pub fn parse_rfc3339(s: &str) -> Result<Self, chrono::ParseError> {
        let dt = DateTime::parse_from_rfc3339(s.trim())?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Seconds since the Unix epoch.
    pub fn unix_seconds(&self) -> i64 {
        self.0.timestamp()
    }

    /// Signed distance `self - other` in whole seconds.
    pub fn seconds_since(&self, other: &Timestamp) -> i64 {
        self.unix_seconds() - other.unix_seconds()
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// ISO8601 string with Z suffix, seconds precision.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Read the current time once.
    fn now(&self) -> Result<Timestamp, ClockError>;
}

/// The operating system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Result<Timestamp, ClockError> {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ClockError(e.to_string()))?;
        let secs = i64::try_from(elapsed.as_secs()).map_err(|e| ClockError(e.to_string()))?;
        Timestamp::from_unix(secs).ok_or_else(|| ClockError(format!("out of range: {secs}")))
    }
}

/// A clock frozen at one instant, for tests and replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Result<Timestamp, ClockError> {
        Ok(self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_truncates_subseconds() {
        let ts = Timestamp::parse_rfc3339("2025-01-15T12:00:00.987Z").unwrap();
        assert_eq!(ts.to_iso8601(), "2025-01-15T12:00:00Z");
    }

    #[test]
    fn parse_converts_offsets_to_utc() {
        let ts = Timestamp::parse_rfc3339("2025-01-15T17:30:00+05:30").unwrap();
        assert_eq!(ts.to_iso8601(), "2025-01-15T12:00:00Z");
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(Timestamp::parse_rfc3339("yesterday").is_err());
        assert!(Timestamp::parse_rfc3339("2025-01-15").is_err());
    }

    #[test]
    fn seconds_since_is_signed() {
        let a = Timestamp::from_unix(1_700_000_000).unwrap();
        let b = Timestamp::from_unix(1_700_000_900).unwrap();
        assert_eq!(b.seconds_since(&a), 900);
        assert_eq!(a.seconds_since(&b), -900);
    }

    #[test]
    fn fixed_clock_is_fixed() {
        let t = Timestamp::from_unix(42).unwrap();
        let clock = FixedClock(t);
        assert_eq!(clock.now().unwrap(), t);
        assert_eq!(clock.now().unwrap(), t);
    }

    #[test]
    fn system_clock_reads_after_2020() {
        let now = SystemClock.now().unwrap();
        assert!(now.unix_seconds() > 1_577_836_800);
    }

    #[test]
    fn serde_roundtrip() {
        let ts = Timestamp::from_unix(1_736_942_400).unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}

//! Authority timestamps.

use crate::error::{ProtocolError, ProtocolResult};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A UTC instant with microsecond precision.
///
/// Precision is fixed at microseconds so that the RFC 3339 text form used in
/// watermarks round-trips exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(i64);

impl Timestamp {
    /// The Unix epoch.
    pub const EPOCH: Timestamp = Timestamp(0);

    /// Creates a timestamp from microseconds since the Unix epoch.
    #[must_use]
    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// Microseconds since the Unix epoch.
    #[must_use]
    pub const fn as_micros(self) -> i64 {
        self.0
    }

    /// Converts a chrono instant, dropping sub-microsecond precision.
    #[must_use]
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.timestamp_micros())
    }

    /// The current wall-clock time.
    #[must_use]
    pub fn now() -> Self {
        Self::from_datetime(Utc::now())
    }

    /// The smallest timestamp strictly after `self`.
    #[must_use]
    pub const fn successor(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Converts to a chrono instant.
    #[must_use]
    pub fn to_datetime(self) -> DateTime<Utc> {
        DateTime::from_timestamp_micros(self.0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// RFC 3339 text with microseconds and a `Z` suffix.
    #[must_use]
    pub fn to_rfc3339(self) -> String {
        self.to_datetime()
            .to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    /// Parses RFC 3339 text; any offset is accepted and normalised to UTC.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::InvalidTimestamp`] for anything else.
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        DateTime::parse_from_rfc3339(text.trim())
            .map(|at| Self::from_datetime(at.with_timezone(&Utc)))
            .map_err(|e| ProtocolError::InvalidTimestamp {
                value: text.to_string(),
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl FromStr for Timestamp {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::parse(&text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_form_is_stable() {
        let ts = Timestamp::parse("2024-03-01T09:30:00.123456Z").unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T09:30:00.123456Z");
        assert_eq!(Timestamp::parse(&ts.to_string()).unwrap(), ts);
    }

    #[test]
    fn offsets_normalise_to_utc() {
        let local = Timestamp::parse("2024-03-01T15:00:00+05:30").unwrap();
        let utc = Timestamp::parse("2024-03-01T09:30:00Z").unwrap();
        assert_eq!(local, utc);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            Timestamp::parse("yesterday"),
            Err(ProtocolError::InvalidTimestamp { .. })
        ));
        assert!(Timestamp::parse("2024-13-01T00:00:00Z").is_err());
    }

    #[test]
    fn successor_is_one_microsecond_later() {
        let ts = Timestamp::from_micros(41);
        assert_eq!(ts.successor().as_micros(), 42);
        assert!(ts.successor() > ts);
    }

    #[test]
    fn serde_uses_text() {
        let ts = Timestamp::from_micros(1_000_000);
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(json, "\"1970-01-01T00:00:01.000000Z\"");
        let back: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ts);
    }
}

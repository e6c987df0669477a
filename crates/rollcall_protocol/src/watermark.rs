//! Pull watermarks.

use crate::entity::EntityKey;
use crate::error::{ProtocolError, ProtocolResult};
use crate::time::Timestamp;
use std::fmt;
use std::str::FromStr;

const KEY_SEPARATOR: char = '@';

/// "Everything up to here has been seen."
///
/// A watermark is a position in a collection's `(last_modified, key)` order.
/// Its text form is opaque to clients:
///
/// - `2024-03-01T09:30:00.000000Z` (bare): everything stamped at or before
///   the instant has been seen
/// - `2024-03-01T09:30:00.000000Z@S001` (composite): everything up to and
///   including key `S001` at that instant has been seen; later keys with the
///   same stamp have not
///
/// The server only hands out composite watermarks; the bare form is accepted
/// for callers that track a plain timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Watermark {
    /// Modification stamp of the last record seen.
    pub stamp: Timestamp,
    /// Key token of the last record seen at `stamp`, if tracked.
    pub key: Option<String>,
}

impl Watermark {
    /// A bare watermark covering everything stamped at or before `stamp`.
    #[must_use]
    pub fn through(stamp: Timestamp) -> Self {
        Self { stamp, key: None }
    }

    /// A composite watermark positioned at `key` within `stamp`.
    pub fn at<K: EntityKey>(stamp: Timestamp, key: &K) -> Self {
        Self {
            stamp,
            key: Some(key.to_token()),
        }
    }

    /// Parses the text form.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedWatermark`] for empty text, an
    /// invalid timestamp, or an empty key part. An empty string is never read
    /// as "no watermark".
    pub fn parse(text: &str) -> ProtocolResult<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ProtocolError::malformed_watermark(text, "empty watermark"));
        }

        let (stamp_text, key) = match trimmed.split_once(KEY_SEPARATOR) {
            Some((_, "")) => {
                return Err(ProtocolError::malformed_watermark(text, "empty key after '@'"));
            }
            Some((stamp, key)) => (stamp, Some(key.to_string())),
            None => (trimmed, None),
        };

        let stamp = Timestamp::parse(stamp_text)
            .map_err(|e| ProtocolError::malformed_watermark(text, e.to_string()))?;

        Ok(Self { stamp, key })
    }

    /// Parses an optional watermark; `None` means "full sync".
    ///
    /// # Errors
    ///
    /// Propagates [`Watermark::parse`] failures for a supplied value.
    pub fn parse_optional(text: Option<&str>) -> ProtocolResult<Option<Self>> {
        text.map(Self::parse).transpose()
    }

    /// Decodes the key part for collection key type `K`.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::MalformedWatermark`] when the token is not a
    /// key of that collection, e.g. a student watermark sent to a timetable
    /// pull.
    pub fn key_as<K: EntityKey>(&self) -> ProtocolResult<Option<K>> {
        match &self.key {
            None => Ok(None),
            Some(token) => K::from_token(token).map(Some).ok_or_else(|| {
                ProtocolError::malformed_watermark(
                    self.to_string(),
                    "key part does not belong to this collection",
                )
            }),
        }
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.key {
            Some(key) => write!(f, "{}{}{}", self.stamp, KEY_SEPARATOR, key),
            None => write!(f, "{}", self.stamp),
        }
    }
}

impl FromStr for Watermark {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{SlotKey, StudentKey, TimetableSlot};
    use crate::SyncEntity;

    #[test]
    fn bare_form() {
        let wm = Watermark::parse("2024-03-01T09:30:00Z").unwrap();
        assert!(wm.key.is_none());
        assert_eq!(wm.to_string(), "2024-03-01T09:30:00.000000Z");
    }

    #[test]
    fn composite_form_round_trips() {
        let stamp = Timestamp::parse("2024-03-01T09:30:00.5Z").unwrap();
        let wm = Watermark::at(stamp, &StudentKey("S@01".into()));
        let parsed = Watermark::parse(&wm.to_string()).unwrap();
        assert_eq!(parsed, wm);
        assert_eq!(
            parsed.key_as::<StudentKey>().unwrap(),
            Some(StudentKey("S@01".into()))
        );
    }

    #[test]
    fn malformed_is_not_absent() {
        assert!(matches!(
            Watermark::parse(""),
            Err(ProtocolError::MalformedWatermark { .. })
        ));
        assert!(matches!(
            Watermark::parse("2024-03-0"),
            Err(ProtocolError::MalformedWatermark { .. })
        ));
        assert!(matches!(
            Watermark::parse("2024-03-01T09:30:00Z@"),
            Err(ProtocolError::MalformedWatermark { .. })
        ));
        assert_eq!(Watermark::parse_optional(None).unwrap(), None);
        assert!(Watermark::parse_optional(Some("nope")).is_err());
    }

    #[test]
    fn foreign_key_part_is_malformed() {
        let stamp = Timestamp::from_micros(10);
        let wm = Watermark::at(stamp, &StudentKey("S001".into()));
        assert!(wm.key_as::<SlotKey>().is_err());

        let slot_key = TimetableSlot::new("CSE", "3", "A", "Monday", 1, "CS301")
            .key()
            .unwrap();
        let wm = Watermark::at(stamp, &slot_key);
        assert_eq!(wm.key_as::<SlotKey>().unwrap(), Some(slot_key));
    }
}

//! Typed pull positions.
//!
//! A [`Watermark`] is opaque text on the wire. Inside the engine it becomes a
//! [`Cursor`] over one collection's key type, so a position can be compared
//! against `(last_modified, key)` pairs directly.

use crate::error::CoreResult;
use rollcall_protocol::{EntityKey, Record, SyncEntity, Timestamp, Watermark};
use std::cmp::Ordering;

/// A position in a collection's `(last_modified, key)` order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor<K> {
    /// Stamp of the last position seen.
    pub stamp: Timestamp,
    /// Key at `stamp`; `None` means every key at `stamp` has been seen.
    pub key: Option<K>,
}

impl<K: EntityKey> Cursor<K> {
    /// Cursor at an exact record position.
    pub fn at(stamp: Timestamp, key: K) -> Self {
        Self {
            stamp,
            key: Some(key),
        }
    }

    /// Parses an optional wire watermark for this key type.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::MalformedWatermark`] when the text is
    /// unparsable or its key part belongs to another collection.
    pub fn parse(text: Option<&str>) -> CoreResult<Option<Self>> {
        match Watermark::parse_optional(text)? {
            Some(watermark) => Ok(Some(Self::from_watermark(&watermark)?)),
            None => Ok(None),
        }
    }

    /// Converts a parsed watermark.
    ///
    /// # Errors
    ///
    /// Returns [`crate::CoreError::MalformedWatermark`] for a foreign key part.
    pub fn from_watermark(watermark: &Watermark) -> CoreResult<Self> {
        Ok(Self {
            stamp: watermark.stamp,
            key: watermark.key_as::<K>()?,
        })
    }

    /// Position of a stored record, if it has been stamped.
    pub fn of<E>(record: &Record<E>) -> Option<Self>
    where
        E: SyncEntity<Key = K>,
    {
        Some(Self::at(record.last_modified?, record.key()?))
    }

    /// Wire form.
    pub fn to_watermark(&self) -> Watermark {
        match &self.key {
            Some(key) => Watermark::at(self.stamp, key),
            None => Watermark::through(self.stamp),
        }
    }

    /// Orders a `(stamp, key)` position relative to this cursor.
    pub fn compare(&self, stamp: Timestamp, key: &K) -> Ordering {
        match stamp.cmp(&self.stamp) {
            Ordering::Equal => match &self.key {
                Some(own) => key.cmp(own),
                None => Ordering::Less,
            },
            other => other,
        }
    }

    /// True when `(stamp, key)` lies strictly after this cursor.
    pub fn precedes(&self, stamp: Timestamp, key: &K) -> bool {
        self.compare(stamp, key) == Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;
    use rollcall_protocol::{SlotKey, StudentKey};

    fn key(s: &str) -> StudentKey {
        StudentKey(s.into())
    }

    #[test]
    fn bare_cursor_skips_whole_stamp() {
        let cursor: Cursor<StudentKey> = Cursor {
            stamp: Timestamp::from_micros(10),
            key: None,
        };
        assert!(!cursor.precedes(Timestamp::from_micros(10), &key("Z")));
        assert!(cursor.precedes(Timestamp::from_micros(11), &key("A")));
        assert!(!cursor.precedes(Timestamp::from_micros(9), &key("Z")));
    }

    #[test]
    fn composite_cursor_breaks_ties_by_key() {
        let cursor = Cursor::at(Timestamp::from_micros(10), key("M"));
        assert!(!cursor.precedes(Timestamp::from_micros(10), &key("A")));
        assert!(!cursor.precedes(Timestamp::from_micros(10), &key("M")));
        assert!(cursor.precedes(Timestamp::from_micros(10), &key("N")));
    }

    #[test]
    fn watermark_text_round_trips() {
        let cursor = Cursor::at(Timestamp::from_micros(1_700_000_000_123_456), key("S 1"));
        let text = cursor.to_watermark().to_string();
        let parsed = Cursor::<StudentKey>::parse(Some(&text)).unwrap();
        assert_eq!(parsed, Some(cursor));
    }

    #[test]
    fn absent_and_malformed_differ() {
        assert_eq!(Cursor::<StudentKey>::parse(None).unwrap(), None);
        assert!(matches!(
            Cursor::<StudentKey>::parse(Some("")),
            Err(CoreError::MalformedWatermark { .. })
        ));

        let student_wm = Cursor::at(Timestamp::EPOCH, key("S001")).to_watermark().to_string();
        assert!(matches!(
            Cursor::<SlotKey>::parse(Some(&student_wm)),
            Err(CoreError::MalformedWatermark { .. })
        ));
    }
}

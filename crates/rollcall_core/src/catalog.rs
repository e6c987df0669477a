//! The subject catalog derived from the timetable.
//!
//! Every `(subject_id, department, semester)` triple taught by a live
//! timetable slot has an entry. Derivation is additive: it fills gaps and
//! never rewrites or removes an entry, so names entered by an administrator
//! survive later timetable pushes and entries outlive the slots that created
//! them.

use rollcall_protocol::{Record, TimetableSlot};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Identity of a catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CatalogKey {
    /// Subject code.
    pub subject_id: String,
    /// Department offering it.
    pub department: String,
    /// Semester it is taught in.
    pub semester: String,
}

/// A subject as offered by one department in one semester.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Subject code.
    pub subject_id: String,
    /// Department offering it.
    pub department: String,
    /// Semester it is taught in.
    pub semester: String,
    /// Display name; defaults to the subject code.
    pub subject_name: String,
    /// Class type such as `theory` or `lab`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_type: Option<String>,
}

impl CatalogEntry {
    /// An entry whose display name is the subject code.
    pub fn new(
        subject_id: impl Into<String>,
        department: impl Into<String>,
        semester: impl Into<String>,
    ) -> Self {
        let subject_id = subject_id.into();
        Self {
            subject_name: subject_id.clone(),
            subject_id,
            department: department.into(),
            semester: semester.into(),
            subject_type: None,
        }
    }

    /// Sets the display name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.subject_name = name.into();
        self
    }

    /// Sets the class type.
    #[must_use]
    pub fn typed(mut self, subject_type: impl Into<String>) -> Self {
        self.subject_type = Some(subject_type.into());
        self
    }

    /// The entry implied by a live slot that names a subject.
    pub fn for_slot(slot: &Record<TimetableSlot>) -> Option<Self> {
        if slot.is_deleted {
            return None;
        }
        let subject = slot.entity.subject()?;
        let mut entry = Self::new(
            subject,
            slot.entity.department.clone(),
            slot.entity.semester.clone(),
        );
        entry.subject_type = slot.entity.slot_type.clone();
        Some(entry)
    }

    /// Identity key.
    pub fn key(&self) -> CatalogKey {
        CatalogKey {
            subject_id: self.subject_id.clone(),
            department: self.department.clone(),
            semester: self.semester.clone(),
        }
    }
}

/// All catalog entries.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    entries: BTreeMap<CatalogKey, CatalogEntry>,
}

impl Catalog {
    /// Entry for `key`.
    pub fn get(&self, key: &CatalogKey) -> Option<&CatalogEntry> {
        self.entries.get(key)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in key order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Entries `slots` imply that the catalog lacks, each triple once.
    pub fn missing_for<'a, I>(&self, slots: I) -> Vec<CatalogEntry>
    where
        I: IntoIterator<Item = &'a Record<TimetableSlot>>,
    {
        let mut seen = BTreeSet::new();
        slots
            .into_iter()
            .filter_map(CatalogEntry::for_slot)
            .filter(|entry| {
                let key = entry.key();
                !self.entries.contains_key(&key) && seen.insert(key)
            })
            .collect()
    }

    /// Merges administrator metadata into the entry for the same triple.
    ///
    /// The name is always replaced; the type only when one is given.
    pub fn merged(&self, update: CatalogEntry) -> CatalogEntry {
        match self.entries.get(&update.key()) {
            Some(existing) => CatalogEntry {
                subject_type: update.subject_type.or_else(|| existing.subject_type.clone()),
                ..update
            },
            None => update,
        }
    }

    /// Stores `entry`, replacing any entry for the same triple.
    pub(crate) fn put(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.key(), entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(subject: &str, section: &str, period: u32) -> Record<TimetableSlot> {
        Record::new(
            TimetableSlot::new("CSE", "3", section, "Monday", period, subject).of_type("theory"),
            1,
        )
    }

    #[test]
    fn one_entry_per_triple() {
        let catalog = Catalog::default();
        let slots = [slot("CS301", "A", 1), slot("CS301", "B", 1), slot("CS302", "A", 2)];
        let missing = catalog.missing_for(&slots);
        assert_eq!(missing.len(), 2);
        assert_eq!(missing[0].subject_name, "CS301");
        assert_eq!(missing[0].subject_type.as_deref(), Some("theory"));
    }

    #[test]
    fn existing_entries_are_not_rederived() {
        let mut catalog = Catalog::default();
        catalog.put(CatalogEntry::new("CS301", "CSE", "3").named("Operating Systems"));
        assert!(catalog.missing_for(&[slot("CS301", "A", 1)]).is_empty());
    }

    #[test]
    fn tombstoned_or_subjectless_slots_derive_nothing() {
        let catalog = Catalog::default();
        let mut dead = slot("CS301", "A", 1);
        dead.is_deleted = true;
        let mut free = slot("CS301", "A", 2);
        free.entity.subject_id = None;
        assert!(catalog.missing_for(&[dead, free]).is_empty());
    }

    #[test]
    fn metadata_merge_keeps_known_type() {
        let mut catalog = Catalog::default();
        catalog.put(CatalogEntry::new("CS301", "CSE", "3").typed("lab"));
        let merged = catalog.merged(CatalogEntry::new("CS301", "CSE", "3").named("OS Lab"));
        assert_eq!(merged.subject_name, "OS Lab");
        assert_eq!(merged.subject_type.as_deref(), Some("lab"));
    }
}

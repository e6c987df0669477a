//! Binds each entity type to its table and its derived-view hook.

use crate::catalog::{Catalog, CatalogEntry};
use crate::table::Table;
use rollcall_protocol::{AttendanceRecord, Record, Student, SyncEntity, TimetableSlot};

/// The authority's tables: one per collection plus the subject catalog.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub(crate) students: Table<Student>,
    pub(crate) slots: Table<TimetableSlot>,
    pub(crate) attendance: Table<AttendanceRecord>,
    pub(crate) catalog: Catalog,
}

impl Tables {
    /// Table of entity type `E`.
    pub fn table<E: StoredEntity>(&self) -> &Table<E> {
        E::table(self)
    }

    /// The subject catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }
}

/// An entity type the authority store can hold.
pub trait StoredEntity: SyncEntity {
    /// This type's table.
    fn table(tables: &Tables) -> &Table<Self>;

    /// This type's table, mutably.
    fn table_mut(tables: &mut Tables) -> &mut Table<Self>;

    /// Catalog entries a set of accepted rows adds. Runs inside the same
    /// commit as the rows.
    fn derive_catalog<'a>(
        _accepted: impl IntoIterator<Item = &'a Record<Self>>,
        _catalog: &Catalog,
    ) -> Vec<CatalogEntry>
    where
        Self: 'a,
    {
        Vec::new()
    }
}

impl StoredEntity for Student {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.students
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.students
    }
}

impl StoredEntity for TimetableSlot {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.slots
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.slots
    }

    fn derive_catalog<'a>(
        accepted: impl IntoIterator<Item = &'a Record<Self>>,
        catalog: &Catalog,
    ) -> Vec<CatalogEntry>
    where
        Self: 'a,
    {
        catalog.missing_for(accepted)
    }
}

impl StoredEntity for AttendanceRecord {
    fn table(tables: &Tables) -> &Table<Self> {
        &tables.attendance
    }

    fn table_mut(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.attendance
    }
}

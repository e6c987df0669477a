//! Property-based test generators using proptest.
//!
//! Keys are drawn from small pools so generated batches collide often.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rollcall_protocol::{AttendanceRecord, Record, RecordBatch, Student, TimetableSlot};

/// Days a slot can fall on.
pub const DAYS: &[&str] = &["Monday", "Tuesday", "Wednesday", "Thursday", "Friday"];

/// Strategy for roll numbers from a pool of `pool` students.
pub fn sbrn_strategy(pool: u16) -> impl Strategy<Value = String> {
    (0..pool.max(1)).prop_map(|n| format!("S{n:03}"))
}

/// Strategy for record versions.
pub fn version_strategy() -> impl Strategy<Value = u64> {
    1u64..8
}

/// Strategy for students with short lowercase names.
fn student_strategy() -> impl Strategy<Value = Student> {
    (
        sbrn_strategy(8),
        "[a-z]{1,8}",
        prop::option::of(prop::sample::select(vec!["A", "B"])),
    )
        .prop_map(|(sbrn, name, section)| {
            let student = Student::new(sbrn, name);
            match section {
                Some(section) => student.enrolled("CSE", "3", section),
                None => student,
            }
        })
}

/// Strategy for student writes, tombstones included.
pub fn student_record_strategy() -> impl Strategy<Value = Record<Student>> {
    (student_strategy(), version_strategy(), any::<bool>()).prop_map(|(student, version, deleted)| {
        if deleted {
            Record::tombstone(student, version)
        } else {
            Record::new(student, version)
        }
    })
}

/// Strategy for CSE-3 timetable slots.
fn slot_strategy() -> impl Strategy<Value = TimetableSlot> {
    (
        prop::sample::select(vec!["A", "B"]),
        prop::sample::select(DAYS.to_vec()),
        1u32..7,
        prop::sample::select(vec!["CS301", "CS302L", "CS303"]),
    )
        .prop_map(|(section, day, period, subject)| {
            let slot = TimetableSlot::new("CSE", "3", section, day, period, subject);
            if subject.ends_with('L') {
                slot.of_type("lab")
            } else {
                slot.of_type("theory")
            }
        })
}

/// Strategy for timetable writes, tombstones included.
pub fn slot_record_strategy() -> impl Strategy<Value = Record<TimetableSlot>> {
    (slot_strategy(), version_strategy(), any::<bool>()).prop_map(|(slot, version, deleted)| {
        if deleted {
            Record::tombstone(slot, version)
        } else {
            Record::new(slot, version)
        }
    })
}

/// Strategy for attendance marks within one fortnight.
fn attendance_strategy() -> impl Strategy<Value = AttendanceRecord> {
    (sbrn_strategy(8), 0u64..14, any::<bool>()).prop_map(|(sbrn, offset, attended)| {
        let start = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap_or_default();
        let date = start.checked_add_days(Days::new(offset)).unwrap_or(start);
        AttendanceRecord::new(sbrn, "CS301", "3", "A", date, attended)
    })
}

/// Strategy for attendance writes. Attendance is never soft-deleted.
pub fn attendance_record_strategy() -> impl Strategy<Value = Record<AttendanceRecord>> {
    (attendance_strategy(), version_strategy())
        .prop_map(|(mark, version)| Record::new(mark, version))
}

/// Strategy for a non-empty batch of any one kind.
pub fn record_batch_strategy() -> impl Strategy<Value = RecordBatch> {
    prop_oneof![
        prop::collection::vec(student_record_strategy(), 1..12).prop_map(RecordBatch::Students),
        prop::collection::vec(slot_record_strategy(), 1..12).prop_map(RecordBatch::TimetableSlots),
        prop::collection::vec(attendance_record_strategy(), 1..12)
            .prop_map(RecordBatch::Attendance),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_protocol::SyncEntity;

    proptest! {
        #[test]
        fn generated_records_have_keys(
            student in student_record_strategy(),
            slot in slot_record_strategy(),
            mark in attendance_record_strategy(),
        ) {
            prop_assert!(student.key().is_some());
            prop_assert!(slot.key().is_some());
            prop_assert!(mark.key().is_some());
            prop_assert!(!mark.is_deleted || AttendanceRecord::SUPPORTS_SOFT_DELETE);
        }

        #[test]
        fn batches_are_never_empty(batch in record_batch_strategy()) {
            prop_assert!(!batch.is_empty());
        }
    }
}

//! Push command implementation.

use super::open_engine;
use rollcall_core::PushReport;
use rollcall_protocol::{EntityKind, RecordBatch};
use std::path::Path;
use tracing::info;

/// Parses a JSON array of `kind` records.
pub fn batch_from_json(kind: EntityKind, json: &str) -> serde_json::Result<RecordBatch> {
    Ok(match kind {
        EntityKind::Student => RecordBatch::Students(serde_json::from_str(json)?),
        EntityKind::TimetableSlot => RecordBatch::TimetableSlots(serde_json::from_str(json)?),
        EntityKind::Attendance => RecordBatch::Attendance(serde_json::from_str(json)?),
    })
}

/// Applies the records in `file` to the journal at `path`.
pub fn push(
    path: &Path,
    kind: &str,
    file: &Path,
) -> Result<PushReport, Box<dyn std::error::Error>> {
    let kind: EntityKind = kind.parse()?;
    let json = std::fs::read_to_string(file)?;
    let batch = batch_from_json(kind, &json)?;

    let engine = open_engine(path)?;
    let report = engine.push(batch)?;
    info!(
        %kind,
        accepted = report.accepted,
        stale = report.stale,
        dropped = report.dropped,
        "push applied"
    );
    Ok(report)
}

/// Runs the push command.
pub fn run(path: &Path, kind: &str, file: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let report = push(path, kind, file)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const STUDENTS: &str = r#"[
        {"sbrn": "S001", "name": "Alice", "department": "CSE", "version": 1},
        {"sbrn": "S002", "name": "Bob", "version": 1, "is_deleted": true},
        {"name": "No Roll Number", "version": 1}
    ]"#;

    #[test]
    fn json_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.journal");
        let file = dir.path().join("students.json");
        std::fs::write(&file, STUDENTS).unwrap();

        let report = push(&path, "students", &file).unwrap();
        assert_eq!((report.accepted, report.dropped), (2, 1));
        assert_eq!(report.deleted, 1);

        let again = push(&path, "students", &file).unwrap();
        assert_eq!((again.accepted, again.stale), (0, 2));
    }

    #[test]
    fn attendance_json_parses() {
        let batch = batch_from_json(
            EntityKind::Attendance,
            r#"[{"sbrn": "S001", "subject_id": "CS301", "semester": "3", "section": "A",
                 "class_date": "2024-02-05", "attended": true, "version": 1}]"#,
        )
        .unwrap();
        assert_eq!(batch.kind(), EntityKind::Attendance);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        assert!(batch_from_json(EntityKind::Student, r#"{"sbrn": "S001"}"#).is_err());
    }
}

//! Verify command implementation.

use super::require_journal;
use rollcall_core::{verify_journal, JournalReport};
use rollcall_storage::FileBackend;
use std::path::Path;

/// Replays the journal at `path` read-only.
pub fn verify(path: &Path) -> Result<JournalReport, Box<dyn std::error::Error>> {
    require_journal(path)?;
    let backend = FileBackend::open_read_only(path)?;
    Ok(verify_journal(&backend)?)
}

/// Runs the verify command.
pub fn run(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    println!("Verifying journal at {:?}", path);
    println!();

    match verify(path) {
        Ok(report) => {
            println!("Frames:      {}", report.frames);
            println!("Valid bytes: {}", report.valid_bytes);
            if report.torn_bytes > 0 {
                println!(
                    "Torn tail:   {} bytes (an interrupted commit; cut on next open)",
                    report.torn_bytes
                );
            }
            println!();
            println!("✓ Journal verification passed");
            Ok(())
        }
        Err(e) => {
            println!("Error: {e}");
            println!();
            println!("✗ Journal verification failed");
            Err("Verification failed".into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_engine;
    use rollcall_protocol::{Record, Student};
    use std::fs::OpenOptions;
    use std::io::Write;

    fn journal_with_two_frames(path: &Path) {
        let engine = open_engine(path).unwrap();
        engine
            .push_records(vec![Record::new(Student::new("S001", "Alice"), 1)])
            .unwrap();
        engine
            .push_records(vec![Record::new(Student::new("S002", "Bob"), 1)])
            .unwrap();
    }

    #[test]
    fn clean_journal_passes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.journal");
        journal_with_two_frames(&path);

        let report = verify(&path).unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.torn_bytes, 0);
    }

    #[test]
    fn torn_tail_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.journal");
        journal_with_two_frames(&path);
        let mut file = OpenOptions::new().append(true).open(&path).unwrap();
        file.write_all(b"RCJL\x01").unwrap();

        let report = verify(&path).unwrap();
        assert_eq!(report.frames, 2);
        assert_eq!(report.torn_bytes, 5);
    }

    #[test]
    fn flipped_byte_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.journal");
        journal_with_two_frames(&path);
        let mut bytes = std::fs::read(&path).unwrap();
        bytes[20] ^= 0xff;
        std::fs::write(&path, bytes).unwrap();

        assert!(verify(&path).is_err());
        assert!(run(&path).is_err());
    }
}

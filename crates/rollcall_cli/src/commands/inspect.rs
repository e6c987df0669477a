//! Inspect command implementation.

use super::require_journal;
use rollcall_core::{verify_journal, CollectionStats};
use rollcall_protocol::Timestamp;
use rollcall_storage::FileBackend;
use serde::Serialize;
use std::path::Path;

/// Journal inspection result.
#[derive(Debug, Serialize)]
pub struct InspectResult {
    /// Journal path.
    pub path: String,
    /// Journal size in bytes.
    pub journal_bytes: u64,
    /// Complete commit frames.
    pub frames: u64,
    /// Bytes of a torn trailing frame.
    pub torn_bytes: u64,
    /// Subject catalog entries.
    pub catalog_entries: usize,
    /// Highest authority stamp handed out.
    pub last_stamp: Timestamp,
    /// Per-collection counters.
    pub collections: Vec<CollectionStats>,
}

/// Reads the journal without modifying it.
pub fn inspect(path: &Path) -> Result<InspectResult, Box<dyn std::error::Error>> {
    require_journal(path)?;
    let backend = FileBackend::open_read_only(path)?;
    let report = verify_journal(&backend)?;

    Ok(InspectResult {
        path: path.display().to_string(),
        journal_bytes: report.valid_bytes + report.torn_bytes,
        frames: report.frames,
        torn_bytes: report.torn_bytes,
        catalog_entries: report.stats.catalog_entries,
        last_stamp: report.stats.last_stamp,
        collections: report.stats.collections,
    })
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(path)?;
    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        _ => {
            print_text_output(&result);
        }
    }
    Ok(())
}

fn print_text_output(result: &InspectResult) {
    println!("Journal: {}", result.path);
    println!();
    println!("Size:            {} bytes", result.journal_bytes);
    println!("Frames:          {}", result.frames);
    if result.torn_bytes > 0 {
        println!("Torn tail:       {} bytes (cut on next open)", result.torn_bytes);
    }
    println!("Catalog entries: {}", result.catalog_entries);
    println!("Last stamp:      {}", result.last_stamp);
    println!();
    println!("{:<16} {:>8} {:>11}  Latest", "Collection", "Rows", "Tombstones");
    for c in &result.collections {
        let latest = c
            .latest_stamp
            .map_or_else(|| "-".to_string(), |stamp| stamp.to_string());
        println!(
            "{:<16} {:>8} {:>11}  {}",
            c.kind.as_str(),
            c.rows,
            c.tombstones,
            latest
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::open_engine;
    use rollcall_protocol::{Record, RecordBatch, Student};

    #[test]
    fn counts_rows_and_tombstones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.journal");
        {
            let engine = open_engine(&path).unwrap();
            engine
                .push(RecordBatch::Students(vec![
                    Record::new(Student::new("S001", "Alice"), 1),
                    Record::tombstone(Student::new("S002", "Bob"), 1),
                ]))
                .unwrap();
        }

        let result = inspect(&path).unwrap();
        assert_eq!(result.frames, 1);
        assert_eq!(result.torn_bytes, 0);
        assert_eq!(result.collections[0].rows, 2);
        assert_eq!(result.collections[0].tombstones, 1);
        assert!(result.journal_bytes > 0);
    }

    #[test]
    fn missing_journal_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(inspect(&dir.path().join("absent.journal")).is_err());
    }
}

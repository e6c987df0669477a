//! Pull command implementation.

use super::{open_engine, require_journal};
use rollcall_protocol::{EntityKind, PullRequest, PullResponse};
use std::path::Path;

/// Serves one pull against the journal at `path`.
pub fn pull(
    path: &Path,
    kind: &str,
    since: Option<String>,
    limit: Option<u32>,
) -> Result<PullResponse, Box<dyn std::error::Error>> {
    let kind: EntityKind = kind.parse()?;
    require_journal(path)?;
    let engine = open_engine(path)?;

    let mut request = PullRequest::since(kind, since);
    request.limit = limit;
    Ok(engine.pull(&request)?)
}

/// Runs the pull command.
pub fn run(
    path: &Path,
    kind: &str,
    since: Option<String>,
    limit: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = pull(path, kind, since, limit)?;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_protocol::{Record, RecordBatch, Student};

    #[test]
    fn pages_through_a_journal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.journal");
        open_engine(&path)
            .unwrap()
            .push(RecordBatch::Students(vec![
                Record::new(Student::new("S001", "Alice"), 1),
                Record::new(Student::new("S002", "Bob"), 1),
            ]))
            .unwrap();

        let first = pull(&path, "students", None, Some(1)).unwrap();
        assert_eq!(first.batch.len(), 1);
        assert!(first.has_more);

        let rest = pull(&path, "students", first.next_watermark, None).unwrap();
        assert_eq!(rest.batch.len(), 1);
        assert!(!rest.has_more);
    }

    #[test]
    fn unknown_kind_and_bad_watermark_fail() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rollcall.journal");
        open_engine(&path).unwrap();

        assert!(pull(&path, "subjects", None, None).is_err());
        assert!(pull(&path, "slots", Some("soon".into()), None).is_err());
    }
}

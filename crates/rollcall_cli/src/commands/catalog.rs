//! Subject catalog commands.

use super::{open_engine, require_journal};
use rollcall_core::CatalogEntry;
use std::path::Path;

/// Runs a full catalog refresh; returns the entries added.
pub fn refresh(path: &Path) -> Result<Vec<CatalogEntry>, Box<dyn std::error::Error>> {
    require_journal(path)?;
    let engine = open_engine(path)?;
    let added = engine.refresh_catalog()?;

    println!("Added {} catalog entries", added.len());
    for entry in &added {
        println!(
            "  {} {} sem {}",
            entry.subject_id, entry.department, entry.semester
        );
    }
    Ok(added)
}

/// Sets the display name (and optionally the type) of a subject.
pub fn name_subject(
    path: &Path,
    subject_id: &str,
    department: &str,
    semester: &str,
    name: &str,
    subject_type: Option<&str>,
) -> Result<CatalogEntry, Box<dyn std::error::Error>> {
    let engine = open_engine(path)?;
    let mut entry = CatalogEntry::new(subject_id, department, semester).named(name);
    if let Some(subject_type) = subject_type {
        entry = entry.typed(subject_type);
    }
    let merged = engine.upsert_catalog_metadata(entry)?;
    println!("{}", serde_json::to_string_pretty(&merged)?);
    Ok(merged)
}

//! Property tests for the reconcilers.

use proptest::prelude::*;
use rollcall_core::{ManualClock, MemoryStore, SyncEngine};
use rollcall_protocol::{Record, Student, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

fn engine() -> SyncEngine<MemoryStore> {
    SyncEngine::with_clock(
        MemoryStore::new(),
        Arc::new(ManualClock::new(Timestamp::from_micros(1_000))),
    )
}

/// A student write drawn from a small key pool so keys collide often.
fn arb_write() -> impl Strategy<Value = Record<Student>> {
    (0u8..6, 1u64..6, any::<bool>(), "[a-z]{1,6}").prop_map(|(key, version, deleted, name)| {
        let student = Student::new(format!("S{key:03}"), name);
        if deleted {
            Record::tombstone(student, version)
        } else {
            Record::new(student, version)
        }
    })
}

fn arb_batch() -> impl Strategy<Value = Vec<Record<Student>>> {
    prop::collection::vec(arb_write(), 1..12)
}

fn versions(engine: &SyncEngine<MemoryStore>) -> BTreeMap<String, u64> {
    engine
        .pull_records::<Student>(None, None)
        .unwrap()
        .records
        .into_iter()
        .map(|r| (r.entity.sbrn, r.version))
        .collect()
}

proptest! {
    #[test]
    fn pushing_twice_equals_pushing_once(batch in arb_batch()) {
        let engine = engine();
        engine.push_records(batch.clone()).unwrap();
        let once = engine.pull_records::<Student>(None, None).unwrap().records;

        let second = engine.push_records(batch.clone()).unwrap();
        prop_assert_eq!(second.accepted, 0);
        prop_assert_eq!(second.stale, batch.len());

        let twice = engine.pull_records::<Student>(None, None).unwrap().records;
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn stored_versions_never_decrease(batches in prop::collection::vec(arb_batch(), 1..6)) {
        let engine = engine();
        let mut previous = BTreeMap::new();
        for batch in batches {
            engine.push_records(batch).unwrap();
            let current = versions(&engine);
            for (key, version) in &previous {
                prop_assert!(current.get(key).copied().unwrap_or(0) >= *version);
            }
            previous = current;
        }
    }

    #[test]
    fn stored_version_is_the_batch_maximum(batch in arb_batch()) {
        let engine = engine();
        engine.push_records(batch.clone()).unwrap();

        let mut expected: BTreeMap<String, u64> = BTreeMap::new();
        for record in &batch {
            let entry = expected.entry(record.entity.sbrn.clone()).or_default();
            *entry = (*entry).max(record.version);
        }
        prop_assert_eq!(versions(&engine), expected);
    }

    #[test]
    fn paged_pull_from_any_watermark_sees_each_change_once(
        before in arb_batch(),
        after in arb_batch(),
        page in 1usize..5,
    ) {
        let engine = engine();
        engine.push_records(before).unwrap();
        let watermark = engine.pull_records::<Student>(None, None).unwrap().next_watermark;

        let versions_before = versions(&engine);
        engine.push_records(after).unwrap();
        let changed: BTreeSet<String> = versions(&engine)
            .into_iter()
            .filter(|(key, version)| *version > versions_before.get(key).copied().unwrap_or(0))
            .map(|(key, _)| key)
            .collect();

        let mut seen = Vec::new();
        let mut cursor = watermark;
        loop {
            let result = engine
                .pull_records::<Student>(cursor.as_deref(), Some(page))
                .unwrap();
            seen.extend(result.records.into_iter().map(|r| r.entity.sbrn));
            cursor = result.next_watermark;
            if !result.has_more {
                break;
            }
        }

        let unique: BTreeSet<String> = seen.iter().cloned().collect();
        prop_assert_eq!(unique.len(), seen.len());
        prop_assert_eq!(unique, changed);
    }
}

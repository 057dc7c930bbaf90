//! Pure reducers for "latest event wins" semantics.
//!
//! Ordering between two candidates: greater `created_at` wins; on equal
//! timestamps the lexicographically smaller id wins. Callers get the same
//! answer regardless of the order the relay returned records in.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::types::EventRecord;

/// `Ordering::Greater` when `a` supersedes `b`.
fn authority(a: &EventRecord, b: &EventRecord) -> Ordering {
    a.created_at
        .cmp(&b.created_at)
        .then_with(|| b.id.cmp(&a.id))
}

/// The single authoritative record among `records`, or `None` if empty.
pub fn select_authoritative<'a, I>(records: I) -> Option<&'a EventRecord>
where
    I: IntoIterator<Item = &'a EventRecord>,
{
    records.into_iter().max_by(|a, b| authority(a, b))
}

/// The authoritative record per author.
pub fn latest_by_author(records: &[EventRecord]) -> HashMap<&str, &EventRecord> {
    let mut latest: HashMap<&str, &EventRecord> = HashMap::new();
    for record in records {
        latest
            .entry(record.pubkey.as_str())
            .and_modify(|current| {
                if authority(record, current) == Ordering::Greater {
                    *current = record;
                }
            })
            .or_insert(record);
    }
    latest
}

/// Drop repeated ids (first occurrence kept), then collapse replaceable
/// coordinates to their authoritative record. Relative order of survivors is
/// preserved.
pub fn merge_records(records: Vec<EventRecord>) -> Vec<EventRecord> {
    let mut seen = HashSet::new();
    let unique: Vec<EventRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.id.clone()))
        .collect();

    let mut winners: HashMap<(u16, &str, &str), &EventRecord> = HashMap::new();
    for record in &unique {
        if let Some(coord) = record.coordinate() {
            winners
                .entry(coord)
                .and_modify(|current| {
                    if authority(record, current) == Ordering::Greater {
                        *current = record;
                    }
                })
                .or_insert(record);
        }
    }
    let keep: HashSet<String> = winners.values().map(|r| r.id.clone()).collect();

    unique
        .into_iter()
        .filter(|r| !r.is_replaceable() || keep.contains(&r.id))
        .collect()
}

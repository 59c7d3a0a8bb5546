// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Stand-in mutation applier producing successor snapshots.
//!
//! Successors share every untouched [`RecordRef`] with their predecessor, the
//! way a synchronisation layer would, so diffs over them exercise the
//! identity fast path.

use std::sync::Arc;

use tagmesh_core::{RawValue, Record, RecordError, RecordRef, Snapshot, TagMap, TagPatch};

/// Applies `patch` to the record `id`, returning the successor snapshot.
///
/// `Null` entries delete; a missing `id` leaves the snapshot unchanged.
pub fn apply_patch(
    snapshot: &Snapshot,
    id: &str,
    patch: &TagPatch,
) -> Result<Snapshot, RecordError> {
    let Some(current) = snapshot.get(id) else {
        return Ok(snapshot.clone());
    };
    let mut next = Record::clone(current);
    write_all(&mut next.tags, &patch.tags);
    for (space, tags) in &patch.masks {
        let mask = next.masks.entry(space.clone()).or_default();
        write_all(mask, tags);
        if mask.is_empty() {
            next.masks.remove(space);
        }
    }
    upsert_record(snapshot, next)
}

fn write_all(target: &mut TagMap, changes: &TagMap) {
    for (tag, value) in changes {
        if matches!(value, RawValue::Null) {
            target.remove(tag);
        } else {
            target.insert(tag.clone(), value.clone());
        }
    }
}

/// Replaces the record with the same id, or appends it.
pub fn upsert_record(snapshot: &Snapshot, record: Record) -> Result<Snapshot, RecordError> {
    let replacement: RecordRef = Arc::new(record);
    let mut replaced = false;
    let mut records: Vec<RecordRef> = snapshot
        .iter()
        .map(|r| {
            if r.id() == replacement.id() {
                replaced = true;
                Arc::clone(&replacement)
            } else {
                Arc::clone(r)
            }
        })
        .collect();
    if !replaced {
        records.push(replacement);
    }
    Snapshot::from_refs(records)
}

/// Drops the record `id`.
pub fn remove_record(snapshot: &Snapshot, id: &str) -> Result<Snapshot, RecordError> {
    Snapshot::from_refs(snapshot.iter().filter(|r| r.id() != id).cloned())
}

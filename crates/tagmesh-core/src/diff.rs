// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record-level difference between two snapshots.

use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::debug;

use crate::record::RecordRef;
use crate::snapshot::Snapshot;

/// Added, removed and updated records between a previous and current state.
///
/// Updated records carry their full current value; tag-level detail is left
/// to the consumer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateDiff {
    /// Records present only in the current state, in current order.
    pub added_records: Vec<RecordRef>,
    /// Ids present only in the previous state, in previous order.
    pub removed_record_ids: Vec<String>,
    /// Records present in both whose content changed, in current order.
    pub updated_records: Vec<RecordRef>,
}

impl StateDiff {
    /// Returns `true` when nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added_records.is_empty()
            && self.removed_record_ids.is_empty()
            && self.updated_records.is_empty()
    }
}

/// Diffs two snapshots.
#[must_use]
pub fn diff(prev: &Snapshot, curr: &Snapshot) -> StateDiff {
    diff_records(prev.records(), curr.records())
}

/// Diffs two record lists keyed by id.
///
/// A record shared by identity in both lists is unchanged without comparing
/// its content.
#[must_use]
pub fn diff_records(prev: &[RecordRef], curr: &[RecordRef]) -> StateDiff {
    let mut previous: FxHashMap<&str, &RecordRef> =
        prev.iter().map(|r| (r.id(), r)).collect();
    let mut out = StateDiff::default();
    for record in curr {
        match previous.remove(record.id()) {
            None => out.added_records.push(RecordRef::clone(record)),
            Some(old) if !RecordRef::ptr_eq(old, record) && **old != **record => {
                out.updated_records.push(RecordRef::clone(record));
            }
            Some(_) => {}
        }
    }
    out.removed_record_ids = prev
        .iter()
        .filter(|r| previous.contains_key(r.id()))
        .map(|r| r.id().to_owned())
        .collect();
    debug!(
        added = out.added_records.len(),
        removed = out.removed_record_ids.len(),
        updated = out.updated_records.len(),
        "diffed snapshots"
    );
    out
}

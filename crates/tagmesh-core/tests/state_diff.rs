// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use proptest::prelude::*;
use tagmesh_core::{diff, Record, Snapshot, TagPatch, TypedValue};
use tagmesh_dry_tests::{apply_patch, remove_record, upsert_record, SnapshotBuilder};

fn base() -> Snapshot {
    SnapshotBuilder::new()
        .with_tags("keep", [("n", 1.0)])
        .with_tags("gone", [("n", 2.0)])
        .with_tags("edit", [("n", 3.0)])
        .build()
        .unwrap()
}

#[test]
fn snapshot_against_itself_is_empty() {
    let snap = base();
    let d = diff(&snap, &snap);
    assert!(d.is_empty());
}

#[test]
fn one_add_one_remove_one_update() {
    let prev = base();
    let patch = TagPatch::new().set_tag("n", &TypedValue::Number(30.0));
    let curr = apply_patch(&prev, "edit", &patch).unwrap();
    let curr = remove_record(&curr, "gone").unwrap();
    let curr = upsert_record(&curr, Record::new("fresh").unwrap()).unwrap();

    let d = diff(&prev, &curr);
    assert_eq!(d.added_records.len(), 1);
    assert_eq!(d.added_records[0].id(), "fresh");
    assert_eq!(d.removed_record_ids, vec!["gone".to_owned()]);
    assert_eq!(d.updated_records.len(), 1);
    assert!(Arc::ptr_eq(&d.updated_records[0], curr.get("edit").unwrap()));
}

#[test]
fn rebuilt_but_equal_records_are_not_updates() {
    let prev = base();
    let copies = prev.iter().map(|r| Record::clone(r));
    let curr = Snapshot::new(copies).unwrap();
    assert!(!Arc::ptr_eq(&prev.records()[0], &curr.records()[0]));
    assert!(diff(&prev, &curr).is_empty());
}

#[test]
fn mask_and_space_changes_are_updates() {
    let prev = base();
    let masked = apply_patch(
        &prev,
        "keep",
        &TagPatch::new().set_mask("tempLocal", "n", &TypedValue::Number(9.0)),
    )
    .unwrap();
    assert_eq!(diff(&prev, &masked).updated_records.len(), 1);

    let moved = Record::clone(prev.get("keep").unwrap()).with_space("shared");
    let curr = upsert_record(&prev, moved).unwrap();
    assert_eq!(diff(&prev, &curr).updated_records.len(), 1);
}

#[test]
fn rebuilt_records_holding_nan_are_not_updates() {
    let prev = SnapshotBuilder::new()
        .with_tags("odd", [("n", f64::NAN)])
        .build()
        .unwrap();
    let curr = Snapshot::new(prev.iter().map(|r| Record::clone(r))).unwrap();
    assert!(!Arc::ptr_eq(&prev.records()[0], &curr.records()[0]));
    assert!(diff(&prev, &curr).is_empty());

    let changed = upsert_record(&prev, Record::new("odd").unwrap().with_tag("n", 1.0)).unwrap();
    assert_eq!(diff(&prev, &changed).updated_records.len(), 1);
}

#[test]
fn removed_ids_follow_previous_order() {
    let prev = base();
    let empty = Snapshot::default();
    let d = diff(&prev, &empty);
    assert_eq!(d.removed_record_ids, ["keep", "gone", "edit"]);
    let d = diff(&empty, &prev);
    let added: Vec<&str> = d.added_records.iter().map(|r| r.id()).collect();
    assert_eq!(added, ["keep", "gone", "edit"]);
}

proptest! {
    #[test]
    fn self_diff_is_always_empty(
        tags in prop::collection::btree_map("[a-z]{1,6}", (0u8..4, "[a-z]{0,3}"), 0..12)
    ) {
        let records = tags.iter().map(|(id, (n, s))| {
            Record::new(id.clone())
                .unwrap()
                .with_tag("n", f64::from(*n))
                .with_tag("s", s.as_str())
        });
        let snap = Snapshot::new(records).unwrap();
        prop_assert!(diff(&snap, &snap).is_empty());
        let rebuilt = Snapshot::new(snap.iter().map(|r| Record::clone(r))).unwrap();
        prop_assert!(diff(&snap, &rebuilt).is_empty());
    }
}

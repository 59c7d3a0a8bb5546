// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Immutable, id-indexed record sets.

use rustc_hash::FxHashMap;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::record::{Record, RecordError, RecordRef};

/// An ordered set of records with unique ids.
///
/// Records are held as [`RecordRef`]s, so a snapshot derived from another can
/// share unchanged records and [`crate::diff()`] can skip them by identity.
/// Serialises as a JSON array of records.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    records: Vec<RecordRef>,
    positions: FxHashMap<String, usize>,
}

impl Snapshot {
    /// Builds a snapshot from owned records.
    pub fn new(records: impl IntoIterator<Item = Record>) -> Result<Self, RecordError> {
        Self::from_refs(records.into_iter().map(Record::into_ref))
    }

    /// Builds a snapshot from shared records, keeping their identity.
    pub fn from_refs(records: impl IntoIterator<Item = RecordRef>) -> Result<Self, RecordError> {
        let records: Vec<RecordRef> = records.into_iter().collect();
        let mut positions = FxHashMap::default();
        positions.reserve(records.len());
        for (i, record) in records.iter().enumerate() {
            if positions.insert(record.id().to_owned(), i).is_some() {
                return Err(RecordError::DuplicateId(record.id().to_owned()));
            }
        }
        Ok(Self { records, positions })
    }

    /// Parses a JSON array of records.
    pub fn from_json(json: &str) -> Result<Self, RecordError> {
        serde_json::from_str(json).map_err(|e| RecordError::Json(e.to_string()))
    }

    /// Records in insertion order.
    #[must_use]
    pub fn records(&self) -> &[RecordRef] {
        &self.records
    }

    /// Looks a record up by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&RecordRef> {
        self.positions.get(id).map(|&i| &self.records[i])
    }

    /// Returns `true` when a record with `id` exists.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` when the snapshot holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterates records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, RecordRef> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a RecordRef;
    type IntoIter = std::slice::Iter<'a, RecordRef>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.records.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Snapshot {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let records = Vec::<Record>::deserialize(deserializer)?;
        Self::new(records).map_err(D::Error::custom)
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_ids_are_rejected() {
        let a = Record::new("a").unwrap();
        let res = Snapshot::new([a.clone(), a]);
        assert_eq!(res.unwrap_err(), RecordError::DuplicateId("a".into()));
    }

    #[test]
    fn json_round_trip_keeps_order() {
        let json = r#"[{"id":"b","tags":{"n":1}},{"id":"a","space":"shared","tags":{}}]"#;
        let snap = Snapshot::from_json(json).unwrap();
        let ids: Vec<&str> = snap.iter().map(|r| r.id()).collect();
        assert_eq!(ids, ["b", "a"]);
        assert_eq!(snap.get("a").and_then(|r| r.space.as_deref()), Some("shared"));
        let again = Snapshot::from_json(&serde_json::to_string(&snap).unwrap()).unwrap();
        assert_eq!(again.records(), snap.records());
    }

    #[test]
    fn bad_json_reports_an_error() {
        assert!(matches!(
            Snapshot::from_json(r#"[{"id":"x"},{"id":"x"}]"#),
            Err(RecordError::Json(msg)) if msg.contains("duplicate record id")
        ));
        assert!(Snapshot::from_json("{").is_err());
    }
}

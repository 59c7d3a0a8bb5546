// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record and snapshot builders for tests.

use tagmesh_core::{RawValue, Record, RecordError, Snapshot};

/// Builds a record with the given base tags.
///
/// ```
/// use tagmesh_dry_tests::record;
///
/// let r = record("bot1", [("color", "red")]).unwrap();
/// assert_eq!(r.id(), "bot1");
/// ```
pub fn record<I, K, V>(id: &str, tags: I) -> Result<Record, RecordError>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<RawValue>,
{
    let mut out = Record::new(id)?;
    for (tag, value) in tags {
        out.tags.insert(tag.into(), value.into());
    }
    Ok(out)
}

/// Builder for [`Snapshot`] instances in tests.
///
/// # Example
///
/// ```
/// use tagmesh_dry_tests::SnapshotBuilder;
///
/// let snap = SnapshotBuilder::new()
///     .with_tags("a", [("kind", "box")])
///     .with_mask("a", "tempLocal", "kind", "ball")
///     .build()
///     .unwrap();
///
/// assert_eq!(snap.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    records: Vec<Record>,
    error: Option<RecordError>,
}

impl SnapshotBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a prepared record.
    pub fn with_record(mut self, record: Record) -> Self {
        self.records.push(record);
        self
    }

    /// Appends a record with the given base tags.
    pub fn with_tags<I, K, V>(mut self, id: &str, tags: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<RawValue>,
    {
        match record(id, tags) {
            Ok(r) => self.records.push(r),
            Err(e) => self.error = self.error.or(Some(e)),
        }
        self
    }

    /// Sets a mask value on the most recent record with `id`.
    pub fn with_mask(
        mut self,
        id: &str,
        space: &str,
        tag: &str,
        value: impl Into<RawValue>,
    ) -> Self {
        if let Some(r) = self.records.iter_mut().rev().find(|r| r.id() == id) {
            r.masks
                .entry(space.to_owned())
                .or_default()
                .insert(tag.to_owned(), value.into());
        }
        self
    }

    /// Builds the snapshot, reporting the first construction error.
    pub fn build(self) -> Result<Snapshot, RecordError> {
        if let Some(e) = self.error {
            return Err(e);
        }
        Snapshot::new(self.records)
    }
}

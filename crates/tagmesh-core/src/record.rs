// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Record ("bot") and raw tag value types.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reserved tag that resolves to the record identifier.
pub const ID_TAG: &str = "id";
/// Reserved tag that resolves to the record's home space.
pub const SPACE_TAG: &str = "space";

/// Shared handle to an immutable record.
///
/// Snapshots hand records out as `Arc`s so that unchanged records can be
/// recognised by pointer identity across snapshots.
pub type RecordRef = Arc<Record>;

/// Tag name → raw value mapping.
pub type TagMap = BTreeMap<String, RawValue>;

/// Space name → tag overrides for that space.
pub type MaskMap = BTreeMap<String, TagMap>;

/// Error returned when constructing records or snapshots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Record identifiers must be non-empty.
    #[error("record id must not be empty")]
    EmptyId,
    /// A snapshot contained the same id twice.
    #[error("duplicate record id: {0}")]
    DuplicateId(String),
    /// Snapshot JSON could not be parsed.
    #[error("snapshot json: {0}")]
    Json(String),
}

/// Raw tag value as stored in `tags` or `masks`.
///
/// Serialised untagged, so snapshot JSON uses plain scalars. `Null` marks an
/// undefined value: it never wins overlay resolution and decodes to nothing.
///
/// Equality is structural with `NaN == NaN`, so two records holding the same
/// `NaN` tag compare equal.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Undefined / deleted.
    #[default]
    Null,
    /// Primitive boolean.
    Bool(bool),
    /// Primitive number.
    Number(f64),
    /// Textual value, possibly carrying a prefix marker.
    Text(String),
    /// Primitive list; elements decode individually.
    List(Vec<RawValue>),
}

impl RawValue {
    /// Returns `true` unless the value is [`RawValue::Null`].
    #[must_use]
    pub fn is_defined(&self) -> bool {
        !matches!(self, Self::Null)
    }

    /// Returns the text content when the value is textual.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl PartialEq for RawValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            #[allow(clippy::float_cmp)]
            (Self::Number(a), Self::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::List(a), Self::List(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A uniquely identified record with base tags and space-scoped tag masks.
///
/// Invariants
/// - `id` is never empty (enforced by [`Record::new`] and deserialisation).
/// - Mask entries only override; they never remove base tags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RecordRepr")]
pub struct Record {
    id: String,
    /// Home space of the record, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub space: Option<String>,
    /// Base tag values.
    #[serde(default)]
    pub tags: TagMap,
    /// Per-space tag overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub masks: MaskMap,
}

#[derive(Deserialize)]
struct RecordRepr {
    id: String,
    #[serde(default)]
    space: Option<String>,
    #[serde(default)]
    tags: TagMap,
    #[serde(default)]
    masks: MaskMap,
}

impl TryFrom<RecordRepr> for Record {
    type Error = RecordError;

    fn try_from(repr: RecordRepr) -> Result<Self, Self::Error> {
        let mut record = Self::new(repr.id)?;
        record.space = repr.space;
        record.tags = repr.tags;
        record.masks = repr.masks;
        Ok(record)
    }
}

impl Record {
    /// Creates an empty record with the given id.
    pub fn new(id: impl Into<String>) -> Result<Self, RecordError> {
        let id = id.into();
        if id.is_empty() {
            return Err(RecordError::EmptyId);
        }
        Ok(Self {
            id,
            space: None,
            tags: TagMap::new(),
            masks: MaskMap::new(),
        })
    }

    /// Returns the record identifier.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Sets the home space.
    #[must_use]
    pub fn with_space(mut self, space: impl Into<String>) -> Self {
        self.space = Some(space.into());
        self
    }

    /// Sets a base tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.tags.insert(tag.into(), value.into());
        self
    }

    /// Sets a mask value for `tag` in `space`.
    #[must_use]
    pub fn with_mask(
        mut self,
        space: impl Into<String>,
        tag: impl Into<String>,
        value: impl Into<RawValue>,
    ) -> Self {
        self.masks
            .entry(space.into())
            .or_default()
            .insert(tag.into(), value.into());
        self
    }

    /// Returns the base tag value (masks ignored).
    #[must_use]
    pub fn tag(&self, tag: &str) -> Option<&RawValue> {
        self.tags.get(tag)
    }

    /// Returns the mask value for `tag` in `space`.
    #[must_use]
    pub fn mask(&self, space: &str, tag: &str) -> Option<&RawValue> {
        self.masks.get(space).and_then(|m| m.get(tag))
    }

    /// Wraps the record in a shared handle.
    #[must_use]
    pub fn into_ref(self) -> RecordRef {
        Arc::new(self)
    }
}

#[allow(clippy::expect_used, clippy::unwrap_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_id_is_rejected() {
        assert_eq!(Record::new(""), Err(RecordError::EmptyId));
    }

    #[test]
    fn deserialize_rejects_empty_id() {
        let res: Result<Record, _> = serde_json::from_str(r#"{"id":"","tags":{}}"#);
        assert!(res.is_err());
    }

    #[test]
    fn raw_values_use_plain_json_scalars() {
        let json = r#"{"id":"a","tags":{"n":1.5,"b":true,"s":"x","z":null,"l":[1,"y"]}}"#;
        let rec: Record = serde_json::from_str(json).unwrap();
        assert_eq!(rec.tag("n"), Some(&RawValue::Number(1.5)));
        assert_eq!(rec.tag("b"), Some(&RawValue::Bool(true)));
        assert_eq!(rec.tag("s"), Some(&RawValue::Text("x".into())));
        assert_eq!(rec.tag("z"), Some(&RawValue::Null));
        assert_eq!(
            rec.tag("l"),
            Some(&RawValue::List(vec![
                RawValue::Number(1.0),
                RawValue::Text("y".into())
            ]))
        );
    }

    #[test]
    fn nan_values_compare_equal() {
        assert_eq!(RawValue::Number(f64::NAN), RawValue::Number(f64::NAN));
        assert_ne!(RawValue::Number(f64::NAN), RawValue::Number(1.0));
        assert_eq!(RawValue::Number(0.0), RawValue::Number(-0.0));
        assert_eq!(
            RawValue::List(vec![RawValue::Number(f64::NAN)]),
            RawValue::List(vec![RawValue::Number(f64::NAN)])
        );
        let a = Record::new("a").unwrap().with_mask("shared", "n", f64::NAN);
        let b = a.clone();
        assert_eq!(a, b);
    }

    #[test]
    fn masks_are_scoped_by_space() {
        let rec = Record::new("a")
            .unwrap()
            .with_tag("color", "red")
            .with_mask("tempLocal", "color", "blue");
        assert_eq!(rec.mask("tempLocal", "color"), Some(&RawValue::from("blue")));
        assert_eq!(rec.mask("shared", "color"), None);
        assert_eq!(rec.tag("color"), Some(&RawValue::from("red")));
    }
}

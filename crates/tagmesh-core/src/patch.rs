// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tag patches: descriptions of tag changes for an external applier.
//!
//! The engine never mutates records. Helpers here only compute what should
//! change; writing it back (and building the next snapshot) is the caller's
//! job. A `Null` entry in a patch deletes the tag.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::codec;
use crate::context::CalcContext;
use crate::error::CalcError;
use crate::record::{MaskMap, RawValue, Record, TagMap};
use crate::value::TypedValue;

/// Suffix of the per-menu sort-order tag (`menu` → `menuSortOrder`).
pub const SORT_ORDER_SUFFIX: &str = "SortOrder";

/// Base-tag and mask changes for one record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagPatch {
    /// Base tag writes; `Null` deletes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: TagMap,
    /// Mask writes per space; `Null` deletes.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub masks: MaskMap,
}

impl TagPatch {
    /// Empty patch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a base tag to `value`.
    #[must_use]
    pub fn set_tag(mut self, tag: impl Into<String>, value: &TypedValue) -> Self {
        self.tags.insert(tag.into(), to_raw(value));
        self
    }

    /// Sets a mask value in `space`.
    #[must_use]
    pub fn set_mask(
        mut self,
        space: impl Into<String>,
        tag: impl Into<String>,
        value: &TypedValue,
    ) -> Self {
        self.masks
            .entry(space.into())
            .or_default()
            .insert(tag.into(), to_raw(value));
        self
    }

    /// Deletes a base tag.
    #[must_use]
    pub fn delete_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into(), RawValue::Null);
        self
    }

    /// Deletes a mask value in `space`.
    #[must_use]
    pub fn delete_mask(mut self, space: impl Into<String>, tag: impl Into<String>) -> Self {
        self.masks
            .entry(space.into())
            .or_default()
            .insert(tag.into(), RawValue::Null);
        self
    }

    /// Combines two patches; entries of `other` win.
    #[must_use]
    pub fn merge(mut self, other: Self) -> Self {
        self.tags.extend(other.tags);
        for (space, tags) in other.masks {
            self.masks.entry(space).or_default().extend(tags);
        }
        self
    }

    /// Returns `true` when the patch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty() && self.masks.values().all(BTreeMap::is_empty)
    }
}

/// Storage form of a typed value: finite numbers and booleans stay
/// primitive, everything else is encoded text.
#[must_use]
pub fn to_raw(value: &TypedValue) -> RawValue {
    match value {
        TypedValue::Bool(b) => RawValue::Bool(*b),
        TypedValue::Number(n) if n.is_finite() => RawValue::Number(*n),
        other => RawValue::Text(codec::encode(other)),
    }
}

/// Name of the sort-order tag for `menu`.
#[must_use]
pub fn sort_order_tag(menu: &str) -> String {
    format!("{menu}{SORT_ORDER_SUFFIX}")
}

/// Patch that appends `item` to `menu`.
///
/// The sort order is the number of records already in the menu (those
/// whose `menu` tag resolves to `true`), not counting `item` itself.
pub fn add_to_menu_patch(
    ctx: &CalcContext,
    menu: &str,
    item: &Record,
) -> Result<TagPatch, CalcError> {
    let members = ctx.query(&[menu], &[TypedValue::Bool(true)])?;
    let count = members.iter().filter(|r| r.id() != item.id()).count();
    let order = u32::try_from(count).map_or(f64::MAX, f64::from);
    Ok(TagPatch::new()
        .set_tag(menu, &TypedValue::Bool(true))
        .set_tag(sort_order_tag(menu), &TypedValue::Number(order)))
}

/// Patch that removes a record from `menu`.
#[must_use]
pub fn remove_from_menu_patch(menu: &str) -> TagPatch {
    TagPatch::new()
        .delete_tag(menu)
        .delete_tag(sort_order_tag(menu))
}

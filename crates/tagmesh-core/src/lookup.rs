// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Multi-tag equality index over a context's records.
//!
//! A query names a list of tags and the value each must resolve to. The first
//! query for a given tag list (and defaults) builds a table over every record
//! in the context, bucketed by the encoded resolved values. Later queries over
//! the same tag list are answered from that table. Tag order in a query does
//! not matter: `(tags, values)` pairs are sorted by tag name first.
//!
//! Values are compared through [`codec::encode`], so `Str("1")` and
//! `Number(1.0)` are different keys.
//!
//! A top-level [`query`] resolves each record with its own energy budget, so
//! large record sets never exhaust a single counter. A query issued from a
//! formula ([`query_with_energy`]) draws from the caller's counter instead.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::codec;
use crate::context::CalcContext;
use crate::energy::Energy;
use crate::error::CalcError;
use crate::record::RecordRef;
use crate::resolve::resolve_cached;
use crate::value::TypedValue;

const KEY_SEPARATOR: char = '\u{1f}';
const DEFAULT_MARK: char = '\u{1e}';
const ESCAPE: char = '\\';

/// Lazily built lookup tables, keyed by sorted tag list and defaults.
#[derive(Default)]
pub struct LookupIndex {
    tables: RefCell<FxHashMap<String, Rc<IndexTable>>>,
    building: RefCell<FxHashSet<String>>,
}

impl fmt::Debug for LookupIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LookupIndex")
            .field("tables", &self.table_count())
            .finish()
    }
}

impl LookupIndex {
    /// Number of tables built so far.
    #[must_use]
    pub fn table_count(&self) -> usize {
        self.tables.borrow().len()
    }

    fn table(&self, key: &str) -> Option<Rc<IndexTable>> {
        self.tables.borrow().get(key).cloned()
    }

    fn insert(&self, key: String, table: Rc<IndexTable>) {
        self.tables.borrow_mut().insert(key, table);
    }

    /// Marks `key` as under construction; `false` if it already was.
    fn begin_build(&self, key: &str) -> bool {
        self.building.borrow_mut().insert(key.to_owned())
    }

    fn end_build(&self, key: &str) {
        self.building.borrow_mut().remove(key);
    }
}

struct IndexTable {
    buckets: FxHashMap<String, Vec<RecordRef>>,
}

/// Records whose `tags` resolve to `values`, pairwise, in context order.
///
/// When `defaults` is given, a record missing a tag is indexed under the
/// corresponding default; without one it is left out of the table.
pub fn query(
    ctx: &CalcContext,
    tags: &[&str],
    values: &[TypedValue],
    defaults: Option<&[Option<TypedValue>]>,
) -> Result<Vec<RecordRef>, CalcError> {
    lookup(ctx, tags, values, defaults, None)
}

/// [`query`] drawing from an existing energy counter.
///
/// Every record resolved while building a missing table is charged to
/// `energy`.
pub fn query_with_energy(
    ctx: &CalcContext,
    tags: &[&str],
    values: &[TypedValue],
    defaults: Option<&[Option<TypedValue>]>,
    energy: &mut Energy,
) -> Result<Vec<RecordRef>, CalcError> {
    lookup(ctx, tags, values, defaults, Some(energy))
}

fn lookup(
    ctx: &CalcContext,
    tags: &[&str],
    values: &[TypedValue],
    defaults: Option<&[Option<TypedValue>]>,
    energy: Option<&mut Energy>,
) -> Result<Vec<RecordRef>, CalcError> {
    if tags.len() != values.len() {
        return Err(CalcError::LookupArity {
            tags: tags.len(),
            values: values.len(),
        });
    }
    if let Some(defaults) = defaults.filter(|d| d.len() != tags.len()) {
        return Err(CalcError::LookupArity {
            tags: tags.len(),
            values: defaults.len(),
        });
    }

    let mut order: Vec<usize> = (0..tags.len()).collect();
    order.sort_by_key(|&i| tags[i]);
    let sorted_tags: Vec<&str> = order.iter().map(|&i| tags[i]).collect();
    let sorted_defaults: Vec<Option<&TypedValue>> = order
        .iter()
        .map(|&i| defaults.and_then(|d| d[i].as_ref()))
        .collect();

    let key = table_key(&sorted_tags, &sorted_defaults);
    let table = if let Some(table) = ctx.lookup().table(&key) {
        table
    } else {
        // A table whose build needs itself can never finish.
        if !ctx.lookup().begin_build(&key) {
            let budget = energy
                .as_deref()
                .map_or(ctx.config().energy_budget, Energy::budget);
            debug!(tags = ?sorted_tags, "lookup table re-entered during its own build");
            return Err(CalcError::EnergyExhausted { budget });
        }
        let built = build_table(ctx, &sorted_tags, &sorted_defaults, energy);
        ctx.lookup().end_build(&key);
        let table = Rc::new(built?);
        ctx.lookup().insert(key, Rc::clone(&table));
        table
    };

    let wanted = join_key(order.iter().map(|&i| codec::encode(&values[i])));
    Ok(table.buckets.get(&wanted).cloned().unwrap_or_default())
}

fn build_table(
    ctx: &CalcContext,
    tags: &[&str],
    defaults: &[Option<&TypedValue>],
    mut shared: Option<&mut Energy>,
) -> Result<IndexTable, CalcError> {
    let mut buckets: FxHashMap<String, Vec<RecordRef>> = FxHashMap::default();
    'records: for record in ctx.objects() {
        let mut own = ctx.energy();
        let energy = match shared.as_deref_mut() {
            Some(energy) => energy,
            None => &mut own,
        };
        let mut parts = Vec::with_capacity(tags.len());
        for (tag, default) in tags.iter().zip(defaults.iter().copied()) {
            let resolved = resolve_cached(ctx, record, tag, energy)?;
            let value = match (Option::as_ref(&resolved), default) {
                (Some(value), _) | (None, Some(value)) => value,
                (None, None) => continue 'records,
            };
            parts.push(codec::encode(value));
        }
        buckets
            .entry(join_key(parts))
            .or_default()
            .push(Arc::clone(record));
    }
    debug!(
        tags = ?tags,
        records = ctx.objects().len(),
        buckets = buckets.len(),
        "built lookup table"
    );
    Ok(IndexTable { buckets })
}

fn table_key(tags: &[&str], defaults: &[Option<&TypedValue>]) -> String {
    let mut key = String::new();
    for (i, (tag, default)) in tags.iter().zip(defaults).enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        push_escaped(&mut key, tag);
        if let Some(value) = default {
            key.push(DEFAULT_MARK);
            push_escaped(&mut key, &codec::encode(value));
        }
    }
    key
}

fn join_key(parts: impl IntoIterator<Item = String>) -> String {
    let mut key = String::new();
    for (i, part) in parts.into_iter().enumerate() {
        if i > 0 {
            key.push(KEY_SEPARATOR);
        }
        push_escaped(&mut key, &part);
    }
    key
}

/// Escapes key delimiters so distinct part lists never share a key.
fn push_escaped(key: &mut String, part: &str) {
    for ch in part.chars() {
        if matches!(ch, KEY_SEPARATOR | DEFAULT_MARK | ESCAPE) {
            key.push(ESCAPE);
        }
        key.push(ch);
    }
}

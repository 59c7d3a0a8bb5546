// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-pass calculation context: record set, memo cache and lookup index.
//!
//! A [`CalcContext`] is built for one logical pass over one record set and
//! dropped afterwards. Nothing in it is global, and there is no invalidation
//! protocol: when the records change, build a new context.
//!
//! The context is single-threaded (`Rc`/`RefCell` inside) and therefore
//! `!Send`; independent contexts over different snapshots need no
//! coordination.

use std::any::Any;
use std::cell::RefCell;
use std::convert::Infallible;
use std::fmt::{self, Display};
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::config::EngineConfig;
use crate::energy::Energy;
use crate::error::CalcError;
use crate::eval::Evaluator;
use crate::lookup::{self, LookupIndex};
use crate::record::{Record, RecordRef, ID_TAG};
use crate::resolve;
use crate::snapshot::Snapshot;
use crate::value::TypedValue;

/// Ephemeral container bundling a record set, a memo cache and a lookup index.
pub struct CalcContext {
    objects: Vec<RecordRef>,
    cache: RefCell<FxHashMap<String, Rc<dyn Any>>>,
    lookup: LookupIndex,
    evaluator: Option<Rc<dyn Evaluator>>,
    config: EngineConfig,
}

impl fmt::Debug for CalcContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalcContext")
            .field("objects", &self.objects.len())
            .field("cached", &self.cache.borrow().len())
            .field("lookup_tables", &self.lookup.table_count())
            .field("evaluator", &self.evaluator.is_some())
            .field("config", &self.config)
            .finish()
    }
}

impl CalcContext {
    /// Creates a context over `objects` with default config and no evaluator.
    pub fn new(objects: impl IntoIterator<Item = RecordRef>) -> Self {
        Self {
            objects: objects.into_iter().collect(),
            cache: RefCell::new(FxHashMap::default()),
            lookup: LookupIndex::default(),
            evaluator: None,
            config: EngineConfig::default(),
        }
    }

    /// Creates a context over every record of `snapshot`, in snapshot order.
    #[must_use]
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        Self::new(snapshot.records().iter().cloned())
    }

    /// Installs the formula evaluator.
    #[must_use]
    pub fn with_evaluator(self, evaluator: impl Evaluator + 'static) -> Self {
        self.with_shared_evaluator(Rc::new(evaluator))
    }

    /// Installs an evaluator shared with other contexts.
    #[must_use]
    pub fn with_shared_evaluator(mut self, evaluator: Rc<dyn Evaluator>) -> Self {
        self.evaluator = Some(evaluator);
        self
    }

    /// Replaces the engine config.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Records visible to this pass, in original order.
    #[must_use]
    pub fn objects(&self) -> &[RecordRef] {
        &self.objects
    }

    /// Engine config for this pass.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The installed evaluator, if any.
    #[must_use]
    pub fn evaluator(&self) -> Option<&dyn Evaluator> {
        self.evaluator.as_deref()
    }

    /// Lookup tables built so far.
    #[must_use]
    pub fn lookup(&self) -> &LookupIndex {
        &self.lookup
    }

    /// Fresh energy counter for one top-level operation.
    #[must_use]
    pub fn energy(&self) -> Energy {
        self.config.energy()
    }

    /// Number of memoized results.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.cache.borrow().len()
    }

    /// Returns the memoized result for `name(args)`, computing it on first use.
    ///
    /// Repeated calls with the same key return the same `Rc`, so callers may
    /// compare results with [`Rc::ptr_eq`].
    pub fn cache_function<T, F>(&self, name: &str, args: &[&dyn Display], compute: F) -> Rc<T>
    where
        T: Any,
        F: FnOnce() -> T,
    {
        match self.try_cache_function(name, args, || Ok::<T, Infallible>(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    /// Fallible variant of [`cache_function`](Self::cache_function); errors
    /// are returned and not cached.
    pub fn try_cache_function<T, E, F>(
        &self,
        name: &str,
        args: &[&dyn Display],
        compute: F,
    ) -> Result<Rc<T>, E>
    where
        T: Any,
        F: FnOnce() -> Result<T, E>,
    {
        let key = cache_key(name, args);
        if let Some(hit) = self.cached::<T>(&key) {
            return Ok(hit);
        }
        // No borrow is held while computing: `compute` may re-enter the cache.
        let value = Rc::new(compute()?);
        self.cache
            .borrow_mut()
            .insert(key, Rc::clone(&value) as Rc<dyn Any>);
        Ok(value)
    }

    fn cached<T: Any>(&self, key: &str) -> Option<Rc<T>> {
        let entry = self.cache.borrow().get(key).cloned()?;
        entry.downcast::<T>().ok()
    }

    /// Resolves `tag` on `record` with a fresh energy budget.
    pub fn resolve(&self, record: &Record, tag: &str) -> Result<Option<TypedValue>, CalcError> {
        resolve::resolve(self, record, tag)
    }

    /// Records whose `tags` resolve to `values` (pairwise).
    pub fn query(&self, tags: &[&str], values: &[TypedValue]) -> Result<Vec<RecordRef>, CalcError> {
        lookup::query(self, tags, values, None)
    }

    /// Like [`query`](Self::query), substituting `defaults` for missing values.
    pub fn query_with_defaults(
        &self,
        tags: &[&str],
        values: &[TypedValue],
        defaults: &[Option<TypedValue>],
    ) -> Result<Vec<RecordRef>, CalcError> {
        lookup::query(self, tags, values, Some(defaults))
    }

    /// Finds a record by id through the lookup index.
    pub fn record_by_id(&self, id: &str) -> Result<Option<RecordRef>, CalcError> {
        let hits = self.query(&[ID_TAG], &[TypedValue::str(id)])?;
        Ok(hits.into_iter().next())
    }
}

/// Builds a memo key: `name` followed by each argument, dash-separated.
///
/// Dashes and backslashes inside an argument are backslash-escaped so that
/// different argument lists cannot produce the same key.
#[must_use]
pub fn cache_key(name: &str, args: &[&dyn Display]) -> String {
    let mut key = String::from(name);
    for arg in args {
        key.push('-');
        for ch in arg.to_string().chars() {
            if ch == '-' || ch == '\\' {
                key.push('\\');
            }
            key.push(ch);
        }
    }
    key
}

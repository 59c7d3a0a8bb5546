// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tag value resolution.
//!
//! Resolution order for `record.tag`:
//! 1. the reserved tags `id` and `space`;
//! 2. tag masks, walking [`EngineConfig::space_priority`] and taking the
//!    first defined value;
//! 3. the base tag;
//! 4. legacy aliases of the tag name through the same overlay.
//!
//! The raw value is decoded with [`codec::decode_raw`]. Formulas are handed to
//! the context's evaluator; scripts, and formulas in a context without an
//! evaluator, come back as [`TypedValue::Unevaluated`].

use std::rc::Rc;

use tracing::trace;

use crate::codec;
use crate::config::EngineConfig;
use crate::context::CalcContext;
use crate::energy::{Energy, FORMULA_COST};
use crate::error::CalcError;
use crate::eval::{EvalScope, Evaluator};
use crate::record::{RawValue, Record, ID_TAG, SPACE_TAG};
use crate::value::{Expr, ExprKind, TypedValue};

/// Prefix used by [`resolve_display`] for failed resolutions.
pub const ERROR_DISPLAY_PREFIX: &str = "#ERROR: ";

/// Resolves `tag` on `record` with a fresh energy budget.
pub fn resolve(
    ctx: &CalcContext,
    record: &Record,
    tag: &str,
) -> Result<Option<TypedValue>, CalcError> {
    let mut energy = ctx.energy();
    resolve_with_energy(ctx, record, tag, &mut energy)
}

/// Resolves `tag` on `record`, drawing from an existing energy counter.
pub fn resolve_with_energy(
    ctx: &CalcContext,
    record: &Record,
    tag: &str,
    energy: &mut Energy,
) -> Result<Option<TypedValue>, CalcError> {
    match tag {
        ID_TAG => return Ok(Some(TypedValue::str(record.id()))),
        SPACE_TAG => return Ok(record.space.clone().map(TypedValue::Str)),
        _ => {}
    }
    let Some(value) = raw_value(ctx.config(), record, tag).and_then(codec::decode_raw) else {
        return Ok(None);
    };
    match (value, ctx.evaluator()) {
        (
            TypedValue::Unevaluated(
                expr @ Expr {
                    kind: ExprKind::Formula,
                    ..
                },
            ),
            Some(evaluator),
        ) => evaluate_formula(ctx, evaluator, record, tag, &expr, energy),
        (value, _) => Ok(Some(value)),
    }
}

/// Memoized [`resolve_with_energy`], keyed by record id and tag name.
///
/// Errors are not cached, so an exhausted lookup is retried by the next
/// caller with its own budget.
pub fn resolve_cached(
    ctx: &CalcContext,
    record: &Record,
    tag: &str,
    energy: &mut Energy,
) -> Result<Rc<Option<TypedValue>>, CalcError> {
    ctx.try_cache_function("resolve", &[&record.id(), &tag], || {
        resolve_with_energy(ctx, record, tag, energy)
    })
}

/// The winning raw value for `tag`, before decoding.
#[must_use]
pub fn raw_value<'r>(config: &EngineConfig, record: &'r Record, tag: &str) -> Option<&'r RawValue> {
    overlay(config, record, tag).or_else(|| {
        config
            .legacy_aliases(tag)
            .find_map(|alias| overlay(config, record, &alias))
    })
}

fn overlay<'r>(config: &EngineConfig, record: &'r Record, tag: &str) -> Option<&'r RawValue> {
    config
        .space_priority
        .iter()
        .filter_map(|space| record.mask(space, tag))
        .chain(record.tag(tag))
        .find(|raw| raw.is_defined())
}

fn evaluate_formula(
    ctx: &CalcContext,
    evaluator: &dyn Evaluator,
    record: &Record,
    tag: &str,
    expr: &Expr,
    energy: &mut Energy,
) -> Result<Option<TypedValue>, CalcError> {
    energy.consume(FORMULA_COST)?;
    trace!(record = record.id(), tag, source = %expr.source, "evaluating formula");
    let mut scope = EvalScope::new(ctx, record, energy);
    evaluator.evaluate(&expr.source, &mut scope)
}

/// Returns `true` when `tag` resolves to any value.
pub fn has_value(ctx: &CalcContext, record: &Record, tag: &str) -> Result<bool, CalcError> {
    Ok(resolve(ctx, record, tag)?.is_some())
}

/// Resolves `tag` as a number; other kinds yield `default`.
///
/// Numeric strings are accepted so that evaluator results such as `"3"`
/// still read as numbers.
pub fn resolve_number(
    ctx: &CalcContext,
    record: &Record,
    tag: &str,
    default: f64,
) -> Result<f64, CalcError> {
    Ok(match resolve(ctx, record, tag)? {
        Some(TypedValue::Number(n)) => n,
        Some(TypedValue::Str(s)) => codec::parse_number(&s).unwrap_or(default),
        _ => default,
    })
}

/// Resolves `tag` as a boolean; other kinds yield `default`.
pub fn resolve_bool(
    ctx: &CalcContext,
    record: &Record,
    tag: &str,
    default: bool,
) -> Result<bool, CalcError> {
    Ok(resolve(ctx, record, tag)?
        .and_then(|v| v.as_bool())
        .unwrap_or(default))
}

/// Resolves `tag` and renders it as text; a missing value yields `default`.
pub fn resolve_string(
    ctx: &CalcContext,
    record: &Record,
    tag: &str,
    default: &str,
) -> Result<String, CalcError> {
    Ok(resolve(ctx, record, tag)?.map_or_else(|| default.to_owned(), |v| v.to_string()))
}

/// Resolves `tag` as a list of linked record ids.
pub fn resolve_links(
    ctx: &CalcContext,
    record: &Record,
    tag: &str,
) -> Result<Vec<String>, CalcError> {
    Ok(match resolve(ctx, record, tag)? {
        Some(TypedValue::Link(ids)) => ids,
        _ => Vec::new(),
    })
}

/// User-facing text for `tag`. Never fails: errors render as
/// `#ERROR: <message>` and missing values as the empty string.
#[must_use]
pub fn resolve_display(ctx: &CalcContext, record: &Record, tag: &str) -> String {
    match resolve(ctx, record, tag) {
        Ok(Some(value)) => value.to_string(),
        Ok(None) => String::new(),
        Err(err) => format!("{ERROR_DISPLAY_PREFIX}{err}"),
    }
}

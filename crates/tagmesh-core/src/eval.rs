// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Formula evaluation seam.
//!
//! The engine does not interpret formula source itself. It hands the text to
//! an [`Evaluator`] together with an [`EvalScope`], which exposes the record
//! being resolved, the context's record set and metered helpers for nested
//! tag lookups and queries. Every helper on the scope draws from the same
//! [`Energy`] as the outer resolve, so runaway formulas fail with
//! [`CalcError::EnergyExhausted`] instead of hanging.

use crate::context::CalcContext;
use crate::energy::{Energy, STEP_COST, TAG_LOOKUP_COST};
use crate::error::CalcError;
use crate::lookup;
use crate::record::{Record, RecordRef};
use crate::resolve;
use crate::value::TypedValue;

/// Interprets formula source text.
pub trait Evaluator {
    /// Evaluates `source` (the formula without its `=` marker).
    ///
    /// Returns `Ok(None)` when the formula produces no value.
    fn evaluate(
        &self,
        source: &str,
        scope: &mut EvalScope<'_>,
    ) -> Result<Option<TypedValue>, CalcError>;
}

impl<F> Evaluator for F
where
    F: Fn(&str, &mut EvalScope<'_>) -> Result<Option<TypedValue>, CalcError>,
{
    fn evaluate(
        &self,
        source: &str,
        scope: &mut EvalScope<'_>,
    ) -> Result<Option<TypedValue>, CalcError> {
        self(source, scope)
    }
}

/// What a formula can see while it runs.
pub struct EvalScope<'a> {
    ctx: &'a CalcContext,
    this: &'a Record,
    energy: &'a mut Energy,
}

impl<'a> EvalScope<'a> {
    pub(crate) fn new(ctx: &'a CalcContext, this: &'a Record, energy: &'a mut Energy) -> Self {
        Self { ctx, this, energy }
    }

    /// The record whose tag is being resolved.
    #[must_use]
    pub fn this(&self) -> &'a Record {
        self.this
    }

    /// All records in the current context.
    #[must_use]
    pub fn objects(&self) -> &'a [RecordRef] {
        self.ctx.objects()
    }

    /// The enclosing context.
    #[must_use]
    pub fn context(&self) -> &'a CalcContext {
        self.ctx
    }

    /// Remaining budget for this evaluation.
    #[must_use]
    pub fn energy(&self) -> &Energy {
        self.energy
    }

    /// Charges one evaluation step. Loops in the evaluator call this per
    /// iteration.
    pub fn step(&mut self) -> Result<(), CalcError> {
        self.energy.consume(STEP_COST)
    }

    /// Resolves `tag` on `record`, metered against this scope's energy.
    pub fn tag(&mut self, record: &Record, tag: &str) -> Result<Option<TypedValue>, CalcError> {
        self.energy.consume(TAG_LOOKUP_COST)?;
        self.energy.enter()?;
        let out = resolve::resolve_with_energy(self.ctx, record, tag, self.energy);
        self.energy.exit();
        out
    }

    /// Resolves `tag` on the record being evaluated.
    pub fn this_tag(&mut self, tag: &str) -> Result<Option<TypedValue>, CalcError> {
        let this = self.this;
        self.tag(this, tag)
    }

    /// Runs a lookup query, metered against this scope's energy.
    ///
    /// Costs one unit and one nesting level, like [`tag`](Self::tag): a
    /// missing table is built by resolving tags on every record.
    pub fn query(
        &mut self,
        tags: &[&str],
        values: &[TypedValue],
    ) -> Result<Vec<RecordRef>, CalcError> {
        self.energy.consume(TAG_LOOKUP_COST)?;
        self.energy.enter()?;
        let out = lookup::query_with_energy(self.ctx, tags, values, None, self.energy);
        self.energy.exit();
        out
    }
}

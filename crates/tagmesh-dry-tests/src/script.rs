// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! A tiny formula evaluator for tests.
//!
//! Formulas are `+`-separated terms:
//!
//! | term | value |
//! |---|---|
//! | `12`, `-1.5e3` | number |
//! | `"text"` | string |
//! | `tags.NAME` | nested lookup of `NAME` on the bound record |
//! | `count` | number of records in the context |
//! | `matches(TAG, VALUE)` | number of records whose `TAG` equals decoded `VALUE` |
//! | `error("msg")` | fails with [`CalcError::Evaluation`] |
//! | `loop` | spins forever, one energy step per iteration |
//!
//! `+` adds two numbers and concatenates anything else. Terms resolving to
//! no value are skipped.

use std::cell::Cell;

use tagmesh_core::codec;
use tagmesh_core::{CalcError, EvalScope, Evaluator, TypedValue};

/// Evaluator for the mini-language above.
///
/// Counts loop iterations so tests can check that exhaustion happens after
/// a deterministic number of steps.
#[derive(Debug, Default)]
pub struct ScriptEvaluator {
    loop_steps: Cell<u64>,
}

impl ScriptEvaluator {
    /// Creates an evaluator with a zeroed step counter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loop iterations completed so far, across all evaluations.
    pub fn loop_steps(&self) -> u64 {
        self.loop_steps.get()
    }

    fn term(&self, term: &str, scope: &mut EvalScope<'_>) -> Result<Option<TypedValue>, CalcError> {
        if term == "loop" {
            loop {
                scope.step()?;
                self.loop_steps.set(self.loop_steps.get() + 1);
            }
        }
        if term == "count" {
            return Ok(Some(count(scope.objects().len())));
        }
        if let Some(name) = term.strip_prefix("tags.") {
            return scope.this_tag(name);
        }
        if let Some(msg) = call_args(term, "error") {
            return Err(CalcError::Evaluation(unquote(msg).to_owned()));
        }
        if let Some(args) = call_args(term, "matches") {
            let Some((tag, value)) = args.split_once(',') else {
                return Err(CalcError::Evaluation(format!("bad arguments: {term}")));
            };
            let value = codec::decode(value.trim()).unwrap_or_else(|| TypedValue::str(""));
            let hits = scope.query(&[tag.trim()], &[value])?;
            return Ok(Some(count(hits.len())));
        }
        if term.len() >= 2 && term.starts_with('"') && term.ends_with('"') {
            return Ok(Some(TypedValue::str(unquote(term))));
        }
        codec::parse_number(term)
            .map(|n| Some(TypedValue::Number(n)))
            .ok_or_else(|| CalcError::Evaluation(format!("unknown term: {term}")))
    }
}

impl Evaluator for ScriptEvaluator {
    fn evaluate(
        &self,
        source: &str,
        scope: &mut EvalScope<'_>,
    ) -> Result<Option<TypedValue>, CalcError> {
        let mut acc: Option<TypedValue> = None;
        for term in split_terms(source) {
            let value = self.term(term.trim(), scope)?;
            acc = match (acc, value) {
                (Some(a), Some(b)) => Some(add(&a, &b)),
                (a, b) => a.or(b),
            };
        }
        Ok(acc)
    }
}

fn add(a: &TypedValue, b: &TypedValue) -> TypedValue {
    match (a, b) {
        (TypedValue::Number(x), TypedValue::Number(y)) => TypedValue::Number(x + y),
        _ => TypedValue::Str(format!("{a}{b}")),
    }
}

fn count(n: usize) -> TypedValue {
    TypedValue::Number(u32::try_from(n).map_or(f64::MAX, f64::from))
}

fn call_args<'a>(term: &'a str, name: &str) -> Option<&'a str> {
    term.strip_prefix(name)?
        .strip_prefix('(')?
        .strip_suffix(')')
}

fn unquote(text: &str) -> &str {
    let text = text.trim();
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

/// Splits on `+` outside of string literals.
fn split_terms(source: &str) -> Vec<&str> {
    let mut terms = Vec::new();
    let mut start = 0;
    let mut quoted = false;
    for (i, ch) in source.char_indices() {
        match ch {
            '"' => quoted = !quoted,
            '+' if !quoted => {
                terms.push(&source[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    terms.push(&source[start..]);
    terms
}

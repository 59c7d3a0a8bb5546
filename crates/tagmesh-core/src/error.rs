// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Errors raised while resolving values or querying a calculation context.
//!
//! Malformed tag literals never surface here: decoding is total. Only the
//! evaluator path and malformed lookup requests can fail.

use thiserror::Error;

/// Error returned by value resolution and lookup queries.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalcError {
    /// The evaluation step budget ran out (looping or self-recursive formula).
    #[error("ran out of energy (budget {budget})")]
    EnergyExhausted {
        /// Budget the evaluation started with.
        budget: u64,
    },
    /// The injected evaluator reported a failure.
    #[error("evaluation failed: {0}")]
    Evaluation(String),
    /// Tag names, values and defaults of a lookup query differ in length.
    #[error("lookup arity mismatch: {tags} tag names but {values} values")]
    LookupArity {
        /// Number of tag names supplied.
        tags: usize,
        /// Number of values (or defaults) supplied.
        values: usize,
    },
}

impl CalcError {
    /// Returns `true` for [`CalcError::EnergyExhausted`].
    #[must_use]
    pub fn is_energy_exhausted(&self) -> bool {
        matches!(self, Self::EnergyExhausted { .. })
    }
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Explicit step budget threaded through formula evaluation.

use crate::error::CalcError;

/// Cost charged for evaluating one formula.
pub const FORMULA_COST: u64 = 1;
/// Cost charged for one nested tag lookup from inside a formula.
pub const TAG_LOOKUP_COST: u64 = 1;
/// Cost charged for one loop iteration reported by an evaluator.
pub const STEP_COST: u64 = 1;

/// Decrementing step counter with a nesting guard.
///
/// The counter bounds loops; the depth guard bounds tag-to-tag recursion
/// before it can exhaust the native stack. Both report
/// [`CalcError::EnergyExhausted`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Energy {
    budget: u64,
    remaining: u64,
    depth: u32,
    max_depth: u32,
}

impl Energy {
    /// Creates a full budget.
    #[must_use]
    pub fn new(budget: u64, max_depth: u32) -> Self {
        Self {
            budget,
            remaining: budget,
            depth: 0,
            max_depth,
        }
    }

    /// Budget this counter started with.
    #[must_use]
    pub fn budget(&self) -> u64 {
        self.budget
    }

    /// Units still available.
    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Units consumed so far.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.budget - self.remaining
    }

    /// Current nesting depth.
    #[must_use]
    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Consumes `cost` units or fails when fewer remain.
    pub fn consume(&mut self, cost: u64) -> Result<(), CalcError> {
        match self.remaining.checked_sub(cost) {
            Some(rest) => {
                self.remaining = rest;
                Ok(())
            }
            None => {
                self.remaining = 0;
                Err(self.exhausted())
            }
        }
    }

    /// Enters one level of nested resolution.
    pub fn enter(&mut self) -> Result<(), CalcError> {
        if self.depth >= self.max_depth {
            return Err(self.exhausted());
        }
        self.depth += 1;
        Ok(())
    }

    /// Leaves one level of nested resolution.
    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn exhausted(&self) -> CalcError {
        tracing::debug!(budget = self.budget, depth = self.depth, "energy exhausted");
        CalcError::EnergyExhausted {
            budget: self.budget,
        }
    }
}

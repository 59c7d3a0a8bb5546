// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! tagmesh-core: value resolution, lookup indexing and state diffs for a
//! graph of tagged records.
//!
//! A caller builds a [`CalcContext`] over a [`Snapshot`], then resolves tag
//! values ([`resolve()`]) and runs equality queries ([`lookup::query`])
//! through it. Results are memoized for the lifetime of the context. The
//! [`diff()`] engine compares two snapshots independently of any context.
//!
//! Formula evaluation is injected through the [`Evaluator`] trait and
//! bounded by an [`Energy`] budget.
#![forbid(unsafe_code)]

pub mod codec;
pub mod config;
pub mod context;
pub mod diff;
pub mod energy;
pub mod error;
pub mod eval;
pub mod lookup;
pub mod patch;
pub mod record;
pub mod resolve;
pub mod snapshot;
pub mod value;

pub use codec::{decode, decode_raw, encode};
pub use config::{ConfigError, ConfigService, ConfigStore, EngineConfig};
pub use context::CalcContext;
pub use diff::{diff, diff_records, StateDiff};
pub use energy::Energy;
pub use error::CalcError;
pub use eval::{EvalScope, Evaluator};
pub use lookup::LookupIndex;
pub use patch::{add_to_menu_patch, remove_from_menu_patch, TagPatch};
pub use record::{MaskMap, RawValue, Record, RecordError, RecordRef, TagMap, ID_TAG, SPACE_TAG};
pub use resolve::{resolve, resolve_display, resolve_with_energy};
pub use snapshot::Snapshot;
pub use value::{DateValue, DateZone, Expr, ExprKind, TypedValue};

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles and fixtures for tagmesh crates.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store fake for testing without filesystem
//! - [`records`] - Record and snapshot builders
//! - [`script`] - A tiny formula evaluator for exercising the resolver
//! - [`apply`] - Stand-in patch applier producing successor snapshots
#![forbid(unsafe_code)]

pub mod apply;
pub mod config;
pub mod records;
pub mod script;

pub use apply::{apply_patch, remove_record, upsert_record};
pub use config::InMemoryConfigStore;
pub use records::{record, SnapshotBuilder};
pub use script::ScriptEvaluator;

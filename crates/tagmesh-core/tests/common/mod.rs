// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code)]

use std::rc::Rc;

use tagmesh_core::{CalcContext, EngineConfig, RecordRef, Snapshot};
use tagmesh_dry_tests::{ScriptEvaluator, SnapshotBuilder};

/// Ids of `records`, in order.
pub fn ids(records: &[RecordRef]) -> Vec<String> {
    records.iter().map(|r| r.id().to_owned()).collect()
}

/// Three records; the first and third share `ghi=jkl, mno=pqr`.
pub fn lookup_snapshot() -> Snapshot {
    SnapshotBuilder::new()
        .with_tags("test1", [("abc", "def"), ("ghi", "jkl"), ("mno", "pqr")])
        .with_tags("test2", [("abc", "ddd"), ("ghi", "jkl"), ("mno", "xyz")])
        .with_tags("test3", [("abc", "def"), ("ghi", "jkl"), ("mno", "pqr")])
        .build()
        .unwrap()
}

/// Context over `snapshot` evaluating formulas with a shared [`ScriptEvaluator`].
pub fn scripted(snapshot: &Snapshot, energy_budget: u64) -> (CalcContext, Rc<ScriptEvaluator>) {
    let evaluator = Rc::new(ScriptEvaluator::new());
    let config = EngineConfig {
        energy_budget,
        ..EngineConfig::default()
    };
    let ctx = CalcContext::from_snapshot(snapshot)
        .with_config(config)
        .with_shared_evaluator(Rc::clone(&evaluator) as Rc<dyn tagmesh_core::Evaluator>);
    (ctx, evaluator)
}

// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::rc::Rc;

use tagmesh_core::resolve::{resolve_cached, resolve_display};
use tagmesh_core::{CalcContext, CalcError, EngineConfig, Expr, RawValue, TypedValue};
use tagmesh_dry_tests::{record, SnapshotBuilder};

#[test]
fn unconditional_loop_exhausts_deterministically() {
    let snap = SnapshotBuilder::new()
        .with_tags("bot", [("spin", "=loop")])
        .build()
        .unwrap();
    let bot = snap.get("bot").unwrap();

    let (ctx, evaluator) = common::scripted(&snap, 100);
    let err = ctx.resolve(bot, "spin").unwrap_err();
    assert_eq!(err, CalcError::EnergyExhausted { budget: 100 });
    let first_run = evaluator.loop_steps();
    assert_eq!(first_run, 99);

    // A second resolve starts from a fresh budget and stops at the same step.
    let _ = ctx.resolve(bot, "spin");
    assert_eq!(evaluator.loop_steps(), first_run * 2);
}

#[test]
fn self_referencing_formula_is_bounded() {
    let snap = SnapshotBuilder::new()
        .with_tags("bot", [("a", "=tags.a")])
        .build()
        .unwrap();
    let (ctx, _) = common::scripted(&snap, 1_000_000);
    let err = ctx.resolve(snap.get("bot").unwrap(), "a").unwrap_err();
    assert!(err.is_energy_exhausted());
}

#[test]
fn mutually_recursive_formulas_are_bounded() {
    let snap = SnapshotBuilder::new()
        .with_tags("bot", [("a", "=tags.b + 1"), ("b", "=tags.a + 1")])
        .build()
        .unwrap();
    let (ctx, _) = common::scripted(&snap, 500);
    let err = ctx.resolve(snap.get("bot").unwrap(), "a").unwrap_err();
    assert!(err.is_energy_exhausted());
}

#[test]
fn formula_querying_its_own_tag_is_bounded() {
    let snap = SnapshotBuilder::new()
        .with_tags("bot", [("x", "=matches(x, 1)")])
        .with_tags("other", [("x", 1.0)])
        .build()
        .unwrap();
    let (ctx, _) = common::scripted(&snap, 100_000);
    let bot = snap.get("bot").unwrap();
    let err = ctx.resolve(bot, "x").unwrap_err();
    assert!(err.is_energy_exhausted());
    assert_eq!(ctx.lookup().table_count(), 0);

    // Querying the same tag from outside hits the same cycle through `bot`.
    let err = ctx.query(&["x"], &[TypedValue::Number(1.0)]).unwrap_err();
    assert!(err.is_energy_exhausted());
}

#[test]
fn query_through_another_tag_still_works() {
    let snap = SnapshotBuilder::new()
        .with_tags("bot", [("ones", "=matches(x, 1)")])
        .with_tags("a", [("x", 1.0)])
        .with_tags("b", [("x", 1.0)])
        .build()
        .unwrap();
    let (ctx, _) = common::scripted(&snap, 1_000);
    let bot = snap.get("bot").unwrap();
    assert_eq!(ctx.resolve(bot, "ones"), Ok(Some(TypedValue::Number(2.0))));
}

#[test]
fn display_callers_render_failures() {
    let snap = SnapshotBuilder::new()
        .with_tags("bot", [("spin", "=loop"), ("oops", "=error(\"bad input\")")])
        .build()
        .unwrap();
    let (ctx, _) = common::scripted(&snap, 10);
    let bot = snap.get("bot").unwrap();
    assert_eq!(
        resolve_display(&ctx, bot, "spin"),
        "#ERROR: ran out of energy (budget 10)"
    );
    assert_eq!(
        resolve_display(&ctx, bot, "oops"),
        "#ERROR: evaluation failed: bad input"
    );
}

#[test]
fn formulas_can_query_the_universe() {
    let snap = SnapshotBuilder::new()
        .with_tags("a", [("kind", "box")])
        .with_tags("b", [("kind", "box")])
        .with_tags("c", [("kind", "ball")])
        .with_tags("counter", [("boxes", "=matches(kind, box)"), ("all", "=count")])
        .build()
        .unwrap();
    let (ctx, _) = common::scripted(&snap, 1_000);
    let counter = snap.get("counter").unwrap();
    assert_eq!(ctx.resolve(counter, "boxes"), Ok(Some(TypedValue::Number(2.0))));
    assert_eq!(ctx.resolve(counter, "all"), Ok(Some(TypedValue::Number(4.0))));
}

#[test]
fn transient_mask_beats_shared_mask_and_base() {
    let snap = SnapshotBuilder::new()
        .with_tags("bot", [("color", "red")])
        .with_mask("bot", "shared", "color", "green")
        .with_mask("bot", "tempLocal", "color", "blue")
        .build()
        .unwrap();
    let ctx = CalcContext::from_snapshot(&snap);
    let bot = snap.get("bot").unwrap();
    assert_eq!(ctx.resolve(bot, "color"), Ok(Some(TypedValue::str("blue"))));

    // Reordering the priority list changes the winner.
    let shared_first = EngineConfig {
        space_priority: vec!["shared".into(), "tempLocal".into()],
        ..EngineConfig::default()
    };
    let ctx = CalcContext::from_snapshot(&snap).with_config(shared_first);
    assert_eq!(ctx.resolve(bot, "color"), Ok(Some(TypedValue::str("green"))));
}

#[test]
fn absent_tags_are_undefined_everywhere() {
    let bot = record("bot", [("x", 1.0)])
        .unwrap()
        .with_mask("tempLocal", "y", 2.0);
    let ctx = CalcContext::new(vec![bot.clone().into_ref()]);
    for tag in ["missing", "X", "auxMissing"] {
        assert_eq!(ctx.resolve(&bot, tag), Ok(None), "tag {tag}");
    }
}

#[test]
fn legacy_alias_set_is_configurable() {
    let bot = record("bot", [("auxColor", "teal"), ("legacyShape", "cube")]).unwrap();
    let ctx = CalcContext::new(vec![bot.clone().into_ref()]);
    assert_eq!(ctx.resolve(&bot, "color"), Ok(Some(TypedValue::str("teal"))));
    assert_eq!(ctx.resolve(&bot, "shape"), Ok(None));

    let config = EngineConfig {
        legacy_tag_prefixes: vec!["legacy".into()],
        ..EngineConfig::default()
    };
    let ctx = CalcContext::new(vec![bot.clone().into_ref()]).with_config(config);
    assert_eq!(ctx.resolve(&bot, "color"), Ok(None));
    assert_eq!(ctx.resolve(&bot, "shape"), Ok(Some(TypedValue::str("cube"))));
}

#[test]
fn offline_context_shows_formula_text() {
    let bot = record("bot", [("sum", "=1 + 2")]).unwrap();
    let ctx = CalcContext::new(vec![bot.clone().into_ref()]);
    let value = ctx.resolve(&bot, "sum").unwrap().unwrap();
    assert_eq!(value, TypedValue::Unevaluated(Expr::formula("1 + 2")));
    assert_eq!(value.to_string(), "=1 + 2");
}

#[test]
fn memoized_resolves_are_reference_identical() {
    let snap = SnapshotBuilder::new()
        .with_tags("bot", [("list", "[1, 2, 3]")])
        .build()
        .unwrap();
    let ctx = CalcContext::from_snapshot(&snap);
    let bot = snap.get("bot").unwrap();
    let mut energy = ctx.energy();
    let a = resolve_cached(&ctx, bot, "list", &mut energy).unwrap();
    let b = resolve_cached(&ctx, bot, "list", &mut energy).unwrap();
    assert!(Rc::ptr_eq(&a, &b));
    assert_eq!(ctx.cache_len(), 1);
}

#[test]
fn null_mask_does_not_hide_the_base_value() {
    let bot = record("bot", [("n", 4.0)])
        .unwrap()
        .with_mask("tempLocal", "n", RawValue::Null);
    let ctx = CalcContext::new(vec![bot.clone().into_ref()]);
    assert_eq!(ctx.resolve(&bot, "n"), Ok(Some(TypedValue::Number(4.0))));
}

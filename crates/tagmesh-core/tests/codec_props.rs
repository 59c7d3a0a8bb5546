// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use proptest::prelude::*;
use tagmesh_core::codec::{decode, encode};
use tagmesh_core::{DateValue, DateZone, Expr, TypedValue};

const ZONES: [Tz; 5] = [
    chrono_tz::America::New_York,
    chrono_tz::Europe::Berlin,
    chrono_tz::Asia::Tokyo,
    chrono_tz::Australia::Sydney,
    chrono_tz::Asia::Kolkata,
];

// 1970-01-01 through 9999-12-30, so every zone's wall clock stays within
// four-digit years.
const MAX_SECS: i64 = 253_402_214_399;

fn instant() -> impl Strategy<Value = DateTime<Utc>> {
    (0..=MAX_SECS, 0u32..1_000_000_000)
        .prop_filter_map("representable", |(secs, nanos)| {
            DateTime::from_timestamp(secs, nanos)
        })
}

fn zone() -> impl Strategy<Value = DateZone> {
    prop_oneof![
        Just(DateZone::Utc),
        (-14 * 60..=14 * 60i32)
            .prop_filter_map("valid offset", |m| FixedOffset::east_opt(m * 60))
            .prop_map(DateZone::Offset),
        (0..ZONES.len()).prop_map(|i| DateZone::Named(ZONES[i])),
    ]
}

fn scalar() -> impl Strategy<Value = TypedValue> {
    prop_oneof![
        any::<f64>()
            .prop_filter("finite", |n| n.is_finite())
            .prop_map(TypedValue::Number),
        any::<bool>().prop_map(TypedValue::Bool),
        "[a-z]{1,8}".prop_map(TypedValue::Str),
    ]
}

fn link_id() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_]{1,8}"
}

// Elements that survive comma splitting: at most one link id, no edge
// whitespace.
fn element() -> impl Strategy<Value = TypedValue> {
    let flat = prop_oneof![
        scalar(),
        Just(TypedValue::str("")),
        prop::collection::vec(link_id(), 0..=1).prop_map(TypedValue::Link),
    ];
    flat.prop_recursive(2, 16, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(TypedValue::Array)
    })
}

fn value() -> impl Strategy<Value = TypedValue> {
    prop_oneof![
        scalar(),
        ".*".prop_map(TypedValue::Str),
        prop::collection::vec(element(), 0..5).prop_map(TypedValue::Array),
        prop::collection::vec(link_id(), 0..5).prop_map(TypedValue::Link),
        (instant(), zone()).prop_map(|(instant, zone)| TypedValue::Date(DateValue { instant, zone })),
        ".*".prop_map(|s| TypedValue::Unevaluated(Expr::formula(s))),
        ".*".prop_map(|s| TypedValue::Unevaluated(Expr::script(s))),
    ]
}

proptest! {
    #[test]
    fn decode_inverts_encode(v in value()) {
        let text = encode(&v);
        prop_assert_eq!(decode(&text), Some(v), "encoded as {:?}", text);
    }

    #[test]
    fn decode_never_panics(text in ".*") {
        let _ = decode(&text);
    }

    #[test]
    fn prefixed_strings_stay_strings(s in ".*") {
        prop_assert_eq!(decode(&format!("📝{s}")), Some(TypedValue::Str(s)));
    }
}

#[test]
fn documented_decode_scenarios() {
    assert_eq!(decode("123"), Some(TypedValue::Number(123.0)));
    assert_eq!(decode("1."), Some(TypedValue::str("1.")));
    assert_eq!(decode("Infinity"), Some(TypedValue::Number(f64::INFINITY)));
    assert_eq!(
        decode("🔗abc,,newId"),
        Some(TypedValue::Link(vec!["abc".into(), "newId".into()]))
    );
    assert_eq!(decode("📅2021-02-29"), None);
}

#[test]
fn multi_id_links_inside_arrays_split_apart() {
    let v = TypedValue::Array(vec![TypedValue::Link(vec!["a".into(), "b".into()])]);
    assert_eq!(encode(&v), "[🔗a,b]");
    assert_eq!(
        decode(&encode(&v)),
        Some(TypedValue::Array(vec![
            TypedValue::Link(vec!["a".into()]),
            TypedValue::str("b"),
        ]))
    );
}

#[test]
fn nan_round_trips_through_the_number_prefix() {
    let text = encode(&TypedValue::Number(f64::NAN));
    assert_eq!(text, "🔢NaN");
    assert!(matches!(decode(&text), Some(TypedValue::Number(n)) if n.is_nan()));
}

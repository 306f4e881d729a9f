//! Cross-type guarantees: convergence of transformed concurrent deltas,
//! compose-equivalence, normalize idempotence and the identity laws,
//! exercised both through the typed APIs and end-to-end through the
//! registry with plain-data payloads.

use proptest::prelude::*;
use serde_json::{json, Value};

use ottypes::types::ot_list::{self, ListOp};
use ottypes::types::ot_string::{self, StrOp};
use ottypes::{Registry, Side};

// ── Registry round trips ──────────────────────────────────────────────────

#[test]
fn nested_string_edits_flow_through_the_registry() {
    let registry = Registry::with_builtins();
    let list = registry.get("list").unwrap();
    let snapshot = json!(["ab", 7]);
    let delta = json!([["apply", "string", [1, "x"]]]);
    let next = list.apply(&snapshot, &delta, &registry).unwrap();
    assert_eq!(next, json!(["axb", 7]));
}

#[test]
fn lists_nest_inside_lists() {
    let registry = Registry::with_builtins();
    let list = registry.get("list").unwrap();
    let snapshot = json!([[1, 2], "z"]);
    let delta = json!([["apply", "list", [["retain", 1], ["insert", 1.5]]]]);
    let next = list.apply(&snapshot, &delta, &registry).unwrap();
    assert_eq!(next, json!([[1, 1.5, 2], "z"]));
}

#[test]
fn concurrent_nested_edits_converge_through_the_registry() {
    let registry = Registry::with_builtins();
    let list = registry.get("list").unwrap();
    let base = json!(["ab"]);
    let ours = json!([["apply", "string", [1, "x"]]]);
    let theirs = json!([["apply", "string", ["y"]]]);
    let ours_t = list.transform(&ours, &theirs, Side::Left, &registry).unwrap();
    let theirs_t = list.transform(&theirs, &ours, Side::Right, &registry).unwrap();
    let via_ours = list
        .apply(&list.apply(&base, &ours, &registry).unwrap(), &theirs_t, &registry)
        .unwrap();
    let via_theirs = list
        .apply(&list.apply(&base, &theirs, &registry).unwrap(), &ours_t, &registry)
        .unwrap();
    assert_eq!(via_ours, via_theirs);
    assert_eq!(via_ours, json!(["yaxb"]));
}

#[test]
fn identity_laws_hold() {
    let registry = Registry::with_builtins();

    let list = registry.get("list").unwrap();
    let snapshot = json!([1, 2, 3]);
    assert_eq!(list.apply(&snapshot, &json!([]), &registry).unwrap(), snapshot);
    let delta = json!([["retain", 1], ["insert", "x"]]);
    assert_eq!(list.compose(&delta, &json!([]), &registry).unwrap(), delta);
    assert_eq!(list.compose(&json!([]), &delta, &registry).unwrap(), delta);

    let string = registry.get("string").unwrap();
    assert_eq!(
        string.apply(&json!("abc"), &json!([]), &registry).unwrap(),
        json!("abc")
    );
    let delta = json!([1, "x"]);
    assert_eq!(string.compose(&delta, &json!([]), &registry).unwrap(), delta);
    assert_eq!(string.compose(&json!([]), &delta, &registry).unwrap(), delta);
}

#[test]
fn snapshots_serialize_to_plain_data() {
    let registry = Registry::with_builtins();
    let set = registry.get("set").unwrap();
    assert_eq!(
        set.serialize(&json!([3, 1, 2, 2])).unwrap(),
        json!([1, 2, 3])
    );
    let map = registry.get("map").unwrap();
    assert_eq!(
        map.create(Some(&json!({"b": 2, "a": 1}))).unwrap(),
        json!({"a": 1, "b": 2})
    );
}

// ── Randomized properties ─────────────────────────────────────────────────

fn str_delta(base_len: usize) -> impl Strategy<Value = Vec<StrOp>> {
    proptest::collection::vec((0..3u8, 1..4usize, "[a-z]{1,3}"), 0..6).prop_map(move |seeds| {
        let mut ops = Vec::new();
        let mut remaining = base_len;
        for (kind, count, text) in seeds {
            match kind {
                0 if remaining > 0 => {
                    let n = count.min(remaining);
                    ops.push(StrOp::Retain(n));
                    remaining -= n;
                }
                1 if remaining > 0 => {
                    let n = count.min(remaining);
                    ops.push(StrOp::Delete(n));
                    remaining -= n;
                }
                _ => ops.push(StrOp::Insert(text)),
            }
        }
        ops
    })
}

fn concurrent_str_deltas() -> impl Strategy<Value = (String, Vec<StrOp>, Vec<StrOp>)> {
    "[a-z]{0,12}".prop_flat_map(|base| {
        let len = base.chars().count();
        (Just(base), str_delta(len), str_delta(len))
    })
}

fn sequential_str_deltas() -> impl Strategy<Value = (String, Vec<StrOp>, Vec<StrOp>)> {
    "[a-z]{0,12}"
        .prop_flat_map(|base| {
            let len = base.chars().count();
            (Just(base), str_delta(len))
        })
        .prop_flat_map(|(base, a)| {
            let mid = ot_string::apply(&base, &a).expect("generated delta stays in range");
            let mid_len = mid.chars().count();
            (Just(base), Just(a), str_delta(mid_len))
        })
}

fn list_delta(base_len: usize) -> impl Strategy<Value = Vec<ListOp>> {
    proptest::collection::vec((0..4u8, 1..4usize, 0..10i64), 0..6).prop_map(move |seeds| {
        let mut ops = Vec::new();
        let mut remaining = base_len;
        for (kind, count, value) in seeds {
            match kind {
                0 if remaining > 0 => {
                    let n = count.min(remaining);
                    ops.push(ListOp::Retain(n));
                    remaining -= n;
                }
                1 if remaining > 0 => {
                    let n = count.min(remaining);
                    ops.push(ListOp::Delete(n));
                    remaining -= n;
                }
                2 if remaining > 0 => {
                    ops.push(ListOp::Apply {
                        subtype: "register".into(),
                        delta: json!(value),
                    });
                    remaining -= 1;
                }
                _ => ops.push(ListOp::Insert(vec![json!(value), json!(value + 1)])),
            }
        }
        ops
    })
}

fn list_base() -> impl Strategy<Value = Vec<Value>> {
    proptest::collection::vec(0..100i64, 0..8)
        .prop_map(|items| items.into_iter().map(|n| json!(n)).collect())
}

fn concurrent_list_deltas() -> impl Strategy<Value = (Vec<Value>, Vec<ListOp>, Vec<ListOp>)> {
    list_base().prop_flat_map(|base| {
        let len = base.len();
        (Just(base), list_delta(len), list_delta(len))
    })
}

fn sequential_list_deltas() -> impl Strategy<Value = (Vec<Value>, Vec<ListOp>, Vec<ListOp>)> {
    list_base()
        .prop_flat_map(|base| {
            let len = base.len();
            (Just(base), list_delta(len))
        })
        .prop_flat_map(|(base, a)| {
            let registry = Registry::with_builtins();
            let mid = ot_list::apply(&base, &a, &registry).expect("generated delta stays in range");
            let mid_len = mid.len();
            (Just(base), Just(a), list_delta(mid_len))
        })
}

proptest! {
    #[test]
    fn string_concurrent_deltas_converge((base, a, b) in concurrent_str_deltas()) {
        let a_t = ot_string::transform(&a, &b, Side::Left).unwrap();
        let b_t = ot_string::transform(&b, &a, Side::Right).unwrap();
        let via_a = ot_string::apply(&ot_string::apply(&base, &a).unwrap(), &b_t).unwrap();
        let via_b = ot_string::apply(&ot_string::apply(&base, &b).unwrap(), &a_t).unwrap();
        prop_assert_eq!(via_a, via_b);
    }

    #[test]
    fn string_compose_matches_sequential_application((base, a, b) in sequential_str_deltas()) {
        let mid = ot_string::apply(&base, &a).unwrap();
        let sequential = ot_string::apply(&mid, &b).unwrap();
        let composed = ot_string::compose(&a, &b).unwrap();
        prop_assert_eq!(sequential, ot_string::apply(&base, &composed).unwrap());
    }

    #[test]
    fn string_normalize_is_idempotent((_, a, _) in concurrent_str_deltas()) {
        let once = ot_string::normalize(&a);
        prop_assert_eq!(ot_string::normalize(&once), once);
    }

    #[test]
    fn list_concurrent_deltas_converge((base, a, b) in concurrent_list_deltas()) {
        let registry = Registry::with_builtins();
        let a_t = ot_list::transform(&a, &b, Side::Left, &registry).unwrap();
        let b_t = ot_list::transform(&b, &a, Side::Right, &registry).unwrap();
        let via_a =
            ot_list::apply(&ot_list::apply(&base, &a, &registry).unwrap(), &b_t, &registry)
                .unwrap();
        let via_b =
            ot_list::apply(&ot_list::apply(&base, &b, &registry).unwrap(), &a_t, &registry)
                .unwrap();
        prop_assert_eq!(via_a, via_b);
    }

    #[test]
    fn list_compose_matches_sequential_application((base, a, b) in sequential_list_deltas()) {
        let registry = Registry::with_builtins();
        let mid = ot_list::apply(&base, &a, &registry).unwrap();
        let sequential = ot_list::apply(&mid, &b, &registry).unwrap();
        let composed = ot_list::compose(&a, &b, &registry).unwrap();
        prop_assert_eq!(sequential, ot_list::apply(&base, &composed, &registry).unwrap());
    }

    #[test]
    fn list_normalize_is_idempotent((_, a, _) in concurrent_list_deltas()) {
        let once = ot_list::normalize(&a);
        prop_assert_eq!(ot_list::normalize(&once), once);
    }
}

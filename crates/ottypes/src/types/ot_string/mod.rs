//! Character sequence with retain/insert/delete ops.
//!
//! Deltas measure in characters, not bytes. On the wire a positive integer
//! retains, a negative integer deletes and a string inserts.

use serde_json::Value;

use crate::delta::{self, push_op, DeltaIter, DeltaOp, OpKind};
use crate::error::{DeltaError, Result};
use crate::ot_type::{OtType, Side};
use crate::registry::Registry;

pub const NAME: &str = "string";
pub const URI: &str = "https://github.com/nicoth-in/ottypes-rs/string";

#[derive(Debug, Clone, PartialEq)]
pub enum StrOp {
    Retain(usize),
    Insert(String),
    Delete(usize),
}

impl DeltaOp for StrOp {
    fn kind(&self) -> OpKind {
        match self {
            StrOp::Retain(_) => OpKind::Retain,
            StrOp::Insert(_) => OpKind::Insert,
            StrOp::Delete(_) => OpKind::Delete,
        }
    }

    fn len(&self) -> usize {
        match self {
            StrOp::Retain(n) | StrOp::Delete(n) => *n,
            StrOp::Insert(s) => s.chars().count(),
        }
    }

    fn slice(&self, offset: usize, len: usize) -> Result<Self> {
        Ok(match self {
            StrOp::Retain(n) => StrOp::Retain(len.min(n - offset)),
            StrOp::Delete(n) => StrOp::Delete(len.min(n - offset)),
            StrOp::Insert(s) => StrOp::Insert(s.chars().skip(offset).take(len).collect()),
        })
    }

    fn retain(len: usize) -> Self {
        StrOp::Retain(len)
    }

    fn merge(&mut self, other: &Self) {
        match (self, other) {
            (StrOp::Retain(n), StrOp::Retain(m)) | (StrOp::Delete(n), StrOp::Delete(m)) => {
                *n += m;
            }
            (StrOp::Insert(s), StrOp::Insert(t)) => s.push_str(t),
            _ => {}
        }
    }
}

pub fn create(initial: Option<&str>) -> String {
    initial.unwrap_or_default().to_owned()
}

pub fn normalize(delta: &[StrOp]) -> Vec<StrOp> {
    delta::normalize(delta.iter().cloned())
}

pub fn apply(s: &str, delta: &[StrOp]) -> Result<String> {
    let chars: Vec<char> = s.chars().collect();
    let delta = normalize(delta);
    let mut result = String::new();
    let mut offset = 0usize;
    for op in &delta {
        match op {
            StrOp::Retain(n) => {
                let end = span_end(offset, *n, chars.len())?;
                result.extend(&chars[offset..end]);
                offset = end;
            }
            StrOp::Insert(text) => result.push_str(text),
            StrOp::Delete(n) => {
                offset = span_end(offset, *n, chars.len())?;
            }
        }
    }
    // implicit trailing retain
    result.extend(&chars[offset..]);
    Ok(result)
}

fn span_end(offset: usize, len: usize, total: usize) -> Result<usize> {
    let end = offset.saturating_add(len);
    if end > total {
        return Err(DeltaError::Range {
            len,
            remaining: total - offset,
        });
    }
    Ok(end)
}

pub fn compose(a: &[StrOp], b: &[StrOp]) -> Result<Vec<StrOp>> {
    let a = normalize(a);
    let b = normalize(b);
    let mut result: Vec<StrOp> = Vec::new();
    let mut iter_a = DeltaIter::new(&a);
    let mut iter_b = DeltaIter::new(&b);

    while iter_a.has_next() || iter_b.has_next() {
        let len_a = iter_a.peek_len();
        let len_b = iter_b.peek_len();
        let min = len_a.min(len_b);
        match (iter_a.peek_kind(), iter_b.peek_kind()) {
            // a's delete happens first; b never saw that span
            (OpKind::Delete, _) => {
                push_op(&mut result, iter_a.take(len_a)?);
            }
            // b's insert lands before whatever a has at this position
            (_, OpKind::Insert) => {
                push_op(&mut result, iter_b.take(len_b)?);
            }
            // a's op survives b's retain
            (OpKind::Retain | OpKind::Insert, OpKind::Retain) => {
                push_op(&mut result, iter_a.take(min)?);
                iter_b.take(min)?;
            }
            // b deletes the span a retained
            (OpKind::Retain, OpKind::Delete) => {
                push_op(&mut result, iter_b.take(min)?);
                iter_a.take(min)?;
            }
            // b deletes what a inserted: both vanish
            (OpKind::Insert, OpKind::Delete) => {
                iter_a.take(min)?;
                iter_b.take(min)?;
            }
            (kind_a, kind_b) => {
                return Err(DeltaError::Malformed(format!(
                    "cannot compose string op pair: {kind_a}, {kind_b}"
                )));
            }
        }
    }
    Ok(delta::normalize(result))
}

pub fn transform(ours: &[StrOp], theirs: &[StrOp], side: Side) -> Result<Vec<StrOp>> {
    let ours = normalize(ours);
    let theirs = normalize(theirs);
    let mut result: Vec<StrOp> = Vec::new();
    let mut iter_ours = DeltaIter::new(&ours);
    let mut iter_theirs = DeltaIter::new(&theirs);

    while iter_ours.has_next() || iter_theirs.has_next() {
        let len_ours = iter_ours.peek_len();
        let len_theirs = iter_theirs.peek_len();
        let min = len_ours.min(len_theirs);
        match (iter_ours.peek_kind(), iter_theirs.peek_kind()) {
            // concurrent inserts at one position: the left side's lands first
            (OpKind::Insert, OpKind::Insert) => {
                if side.is_left() {
                    push_op(&mut result, iter_ours.take(len_ours)?);
                } else {
                    push_op(&mut result, StrOp::Retain(len_theirs));
                    push_op(&mut result, iter_ours.take(len_ours)?);
                    iter_theirs.take(len_theirs)?;
                }
            }
            // our insert lands before their op
            (OpKind::Insert, _) => {
                push_op(&mut result, iter_ours.take(len_ours)?);
            }
            // shift past the span they inserted
            (_, OpKind::Insert) => {
                push_op(&mut result, StrOp::Retain(len_theirs));
                iter_theirs.take(len_theirs)?;
            }
            // their delete already removed the span our op touched
            (OpKind::Retain | OpKind::Delete, OpKind::Delete) => {
                iter_ours.take(min)?;
                iter_theirs.take(min)?;
            }
            // our op consumes their retain
            (OpKind::Retain | OpKind::Delete, OpKind::Retain) => {
                push_op(&mut result, iter_ours.take(min)?);
                iter_theirs.take(min)?;
            }
            (kind_ours, kind_theirs) => {
                return Err(DeltaError::Malformed(format!(
                    "cannot transform string op pair: {kind_ours}, {kind_theirs}"
                )));
            }
        }
    }
    Ok(delta::normalize(result))
}

// ── Wire format ───────────────────────────────────────────────────────────

pub fn decode_delta(value: &Value) -> Result<Vec<StrOp>> {
    let Value::Array(items) = value else {
        return Err(DeltaError::Malformed(format!(
            "string delta must be an array, got {value}"
        )));
    };
    items
        .iter()
        .map(|item| match item {
            Value::Number(n) => {
                let count = n.as_i64().ok_or_else(|| {
                    DeltaError::Malformed(format!("string op count must be an integer, got {n}"))
                })?;
                if count >= 0 {
                    Ok(StrOp::Retain(count as usize))
                } else {
                    Ok(StrOp::Delete(count.unsigned_abs() as usize))
                }
            }
            Value::String(text) => Ok(StrOp::Insert(text.clone())),
            other => Err(DeltaError::Malformed(format!(
                "string op must be an integer or text, got {other}"
            ))),
        })
        .collect()
}

pub fn encode_delta(delta: &[StrOp]) -> Value {
    Value::Array(
        delta
            .iter()
            .map(|op| match op {
                StrOp::Retain(n) => Value::from(*n as u64),
                StrOp::Delete(n) => Value::from(-(*n as i64)),
                StrOp::Insert(text) => Value::String(text.clone()),
            })
            .collect(),
    )
}

/// Registry entry for the string type.
pub struct StringType;

impl OtType for StringType {
    fn name(&self) -> &'static str {
        NAME
    }

    fn uri(&self) -> Option<&'static str> {
        Some(URI)
    }

    fn create(&self, initial: Option<&Value>) -> Result<Value> {
        match initial {
            None => Ok(Value::String(String::new())),
            Some(Value::String(s)) => Ok(Value::String(s.clone())),
            Some(other) => Err(DeltaError::Malformed(format!(
                "string snapshot must be text, got {other}"
            ))),
        }
    }

    fn apply(&self, snapshot: &Value, delta: &Value, _registry: &Registry) -> Result<Value> {
        let Value::String(s) = snapshot else {
            return Err(DeltaError::Malformed(format!(
                "string snapshot must be text, got {snapshot}"
            )));
        };
        Ok(Value::String(apply(s, &decode_delta(delta)?)?))
    }

    fn compose(&self, a: &Value, b: &Value, _registry: &Registry) -> Result<Value> {
        Ok(encode_delta(&compose(&decode_delta(a)?, &decode_delta(b)?)?))
    }

    fn transform(
        &self,
        ours: &Value,
        theirs: &Value,
        side: Side,
        _registry: &Registry,
    ) -> Result<Value> {
        Ok(encode_delta(&transform(
            &decode_delta(ours)?,
            &decode_delta(theirs)?,
            side,
        )?))
    }

    fn normalize(&self, delta: &Value) -> Result<Value> {
        Ok(encode_delta(&normalize(&decode_delta(delta)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn decode(value: Value) -> Vec<StrOp> {
        decode_delta(&value).unwrap()
    }

    #[test]
    fn apply_cases() {
        let cases = [
            ("", json!(["x"]), "x"),
            ("", json!(["xyz"]), "xyz"),
            ("abc", json!([-1]), "bc"),
            ("abc", json!([-2]), "c"),
            ("abc", json!([-2, "d"]), "dc"),
            ("abc", json!([2, "x"]), "abxc"),
            ("abcd", json!([1, "x", 1, -1]), "axbd"),
        ];
        for (base, delta, expected) in cases {
            assert_eq!(apply(base, &decode(delta)).unwrap(), expected);
        }
    }

    #[test]
    fn apply_rejects_overruns() {
        assert_eq!(
            apply("ab", &decode(json!([3]))),
            Err(DeltaError::Range { len: 3, remaining: 2 })
        );
        assert!(apply("ab", &decode(json!([1, -2]))).is_err());
    }

    #[test]
    fn apply_measures_characters_not_bytes() {
        assert_eq!(apply("héllo", &decode(json!([1, -1, "e"]))).unwrap(), "hello");
    }

    #[test]
    fn compose_cases() {
        let cases = [
            (json!([3]), json!([4]), json!([])),
            (json!(["x"]), json!(["y"]), json!(["yx"])),
            (json!([-1]), json!([-2]), json!([-3])),
            (json!([3, "z"]), json!(["xy"]), json!(["xy", 3, "z"])),
            (json!(["xy"]), json!([3, "z"]), json!(["xy", 1, "z"])),
            (json!([2, "x"]), json!([-1]), json!([-1, 1, "x"])),
            (json!([-1]), json!([2, "x"]), json!([-1, 2, "x"])),
            (json!(["x"]), json!([-2]), json!([-1])),
            (json!([-2]), json!(["x"]), json!([-2, "x"])),
        ];
        for (a, b, expected) in cases {
            let composed = compose(&decode(a.clone()), &decode(b.clone())).unwrap();
            assert_eq!(encode_delta(&composed), expected, "compose({a}, {b})");
        }
    }

    #[test]
    fn compose_matches_sequential_application() {
        let base = "hello";
        let a = decode(json!([2, -2, "LL"]));
        let b = decode(json!([1, "E", 2, -1, "O"]));
        let mid = apply(base, &a).unwrap();
        let sequential = apply(&mid, &b).unwrap();
        let composed = apply(base, &compose(&a, &b).unwrap()).unwrap();
        assert_eq!(sequential, composed);
    }

    #[test]
    fn transform_cases() {
        // (base, ours, theirs, ours', theirs', converged)
        let cases = [
            ("123", json!([3, "x"]), json!([1, "y"]), json!([4, "x"]), json!([1, "y"]), "1y23x"),
            ("123", json!([-1]), json!([-2]), json!([]), json!([-1]), "3"),
            ("123", json!(["xy"]), json!(["z"]), json!(["xy"]), json!([2, "z"]), "xyz123"),
            ("123", json!([3, "x"]), json!([-2]), json!([1, "x"]), json!([-2]), "3x"),
            ("123", json!([3, "x"]), json!(["0"]), json!([4, "x"]), json!(["0"]), "0123x"),
            ("123", json!([-2]), json!(["x"]), json!([1, -2]), json!(["x"]), "x3"),
            ("123", json!([-1, "x"]), json!(["y", 1, "z"]), json!([1, -1, "x"]), json!(["y", 1, "z"]), "yxz23"),
        ];
        for (base, ours, theirs, expected_ours, expected_theirs, converged) in cases {
            let ours = decode(ours);
            let theirs = decode(theirs);
            let ours_t = transform(&ours, &theirs, Side::Left).unwrap();
            assert_eq!(encode_delta(&ours_t), expected_ours);
            let theirs_t = transform(&theirs, &ours, Side::Right).unwrap();
            assert_eq!(encode_delta(&theirs_t), expected_theirs);
            let via_ours = apply(&apply(base, &ours).unwrap(), &theirs_t).unwrap();
            let via_theirs = apply(&apply(base, &theirs).unwrap(), &ours_t).unwrap();
            assert_eq!(via_ours, converged);
            assert_eq!(via_theirs, converged);
        }
    }

    #[test]
    fn normalize_is_canonical() {
        let delta = decode(json!([1, 2, "a", "b", -1, 0, 3]));
        let normalized = normalize(&delta);
        assert_eq!(encode_delta(&normalized), json!([3, -1, "ab"]));
        assert_eq!(normalize(&normalized), normalized);
    }

    #[test]
    fn decode_rejects_bad_ops() {
        assert!(decode_delta(&json!("x")).is_err());
        assert!(decode_delta(&json!([1.5])).is_err());
        assert!(decode_delta(&json!([true])).is_err());
    }
}

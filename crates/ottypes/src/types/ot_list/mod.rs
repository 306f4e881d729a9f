//! Ordered sequence of arbitrary elements.
//!
//! The richest op grammar of the library: retain/insert/delete runs, apply
//! for delegating into a nested subtype, and cut/paste for moving an
//! element within one delta. On the wire every op is a tagged tuple:
//! `["retain", n]`, `["insert", v, ...]`, `["delete", n]`,
//! `["apply", subtype, delta]`, `["cut", key]`, `["paste", key]`.

use indexmap::IndexMap;
use serde_json::Value;

use crate::delta::{self, push_op, DeltaIter, DeltaOp, OpKind};
use crate::error::{DeltaError, Result};
use crate::ot_type::{OtType, Side};
use crate::registry::Registry;

pub const NAME: &str = "list";
pub const URI: &str = "https://github.com/nicoth-in/ottypes-rs/list";

#[derive(Debug, Clone, PartialEq)]
pub enum ListOp {
    Retain(usize),
    Insert(Vec<Value>),
    Delete(usize),
    Apply { subtype: String, delta: Value },
    Cut(String),
    Paste(String),
}

impl DeltaOp for ListOp {
    fn kind(&self) -> OpKind {
        match self {
            ListOp::Retain(_) => OpKind::Retain,
            ListOp::Insert(_) => OpKind::Insert,
            ListOp::Delete(_) => OpKind::Delete,
            ListOp::Apply { .. } => OpKind::Apply,
            ListOp::Cut(_) => OpKind::Cut,
            ListOp::Paste(_) => OpKind::Paste,
        }
    }

    fn len(&self) -> usize {
        match self {
            ListOp::Retain(n) | ListOp::Delete(n) => *n,
            ListOp::Insert(values) => values.len(),
            ListOp::Apply { .. } | ListOp::Cut(_) => 1,
            // a paste re-inserts a cut element without consuming a position
            ListOp::Paste(_) => 0,
        }
    }

    fn slice(&self, offset: usize, len: usize) -> Result<Self> {
        match self {
            ListOp::Retain(n) => Ok(ListOp::Retain(len.min(n - offset))),
            ListOp::Delete(n) => Ok(ListOp::Delete(len.min(n - offset))),
            ListOp::Insert(values) => Ok(ListOp::Insert(
                values.iter().skip(offset).take(len).cloned().collect(),
            )),
            ListOp::Apply { .. } | ListOp::Cut(_) => {
                if offset == 0 && len >= 1 {
                    Ok(self.clone())
                } else {
                    Err(DeltaError::Malformed(format!(
                        "cannot slice an indivisible {} op",
                        self.kind()
                    )))
                }
            }
            ListOp::Paste(_) => Ok(self.clone()),
        }
    }

    fn retain(len: usize) -> Self {
        ListOp::Retain(len)
    }

    fn merge(&mut self, other: &Self) {
        match (self, other) {
            (ListOp::Retain(n), ListOp::Retain(m)) | (ListOp::Delete(n), ListOp::Delete(m)) => {
                *n += m;
            }
            (ListOp::Insert(values), ListOp::Insert(more)) => {
                values.extend(more.iter().cloned());
            }
            _ => {}
        }
    }

    fn cancels(&self, next: &Self) -> bool {
        matches!((self, next), (ListOp::Cut(cut), ListOp::Paste(paste)) if cut == paste)
    }
}

pub fn create(initial: &[Value]) -> Vec<Value> {
    initial.to_vec()
}

pub fn normalize(delta: &[ListOp]) -> Vec<ListOp> {
    delta::normalize(delta.iter().cloned())
}

pub fn apply(list: &[Value], delta: &[ListOp], registry: &Registry) -> Result<Vec<Value>> {
    let delta = normalize(delta);

    // Pass 1: capture every cut element against the pre-edit snapshot before
    // any output is produced; a paste may precede its cut in position order.
    let mut buffer: IndexMap<&str, &Value> = IndexMap::new();
    let mut offset = 0usize;
    for op in &delta {
        match op {
            ListOp::Retain(n) | ListOp::Delete(n) => offset += n,
            ListOp::Apply { .. } => offset += 1,
            ListOp::Cut(key) => {
                if buffer.contains_key(key.as_str()) {
                    return Err(DeltaError::Malformed(format!("duplicate cut key: {key}")));
                }
                let element = list.get(offset).ok_or(DeltaError::Range {
                    len: 1,
                    remaining: list.len().saturating_sub(offset),
                })?;
                buffer.insert(key, element);
                offset += 1;
            }
            ListOp::Insert(_) | ListOp::Paste(_) => {}
        }
    }

    // Pass 2: build the new sequence left to right.
    let mut result = Vec::new();
    let mut offset = 0usize;
    for op in &delta {
        match op {
            ListOp::Retain(n) => {
                let end = span_end(offset, *n, list.len())?;
                result.extend_from_slice(&list[offset..end]);
                offset = end;
            }
            ListOp::Insert(values) => result.extend_from_slice(values),
            ListOp::Delete(n) => {
                offset = span_end(offset, *n, list.len())?;
            }
            ListOp::Apply { subtype, delta: nested } => {
                let element = list.get(offset).ok_or(DeltaError::Range {
                    len: 1,
                    remaining: 0,
                })?;
                let ty = registry.get(subtype)?;
                result.push(ty.apply(element, nested, registry)?);
                offset += 1;
            }
            ListOp::Cut(_) => {
                offset = span_end(offset, 1, list.len())?;
            }
            ListOp::Paste(key) => {
                let element = buffer.get(key.as_str()).ok_or_else(|| {
                    DeltaError::Malformed(format!("paste without a matching cut: {key}"))
                })?;
                result.push((*element).clone());
            }
        }
    }
    // implicit trailing retain
    result.extend_from_slice(&list[offset..]);
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

pub fn compose(a: &[ListOp], b: &[ListOp], registry: &Registry) -> Result<Vec<ListOp>> {
    let a = normalize(a);
    let b = normalize(b);
    let mut result: Vec<ListOp> = Vec::new();
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
            (OpKind::Retain | OpKind::Insert | OpKind::Apply, OpKind::Insert) => {
                push_op(&mut result, iter_b.take(len_b)?);
            }
            // b deletes what a inserted: both vanish
            (OpKind::Insert, OpKind::Delete) => {
                iter_a.take(min)?;
                iter_b.take(min)?;
            }
            // a's op survives b's retain
            (OpKind::Retain | OpKind::Insert | OpKind::Apply, OpKind::Retain) => {
                push_op(&mut result, iter_a.take(min)?);
                iter_b.take(min)?;
            }
            // b's op replaces a's retain
            (OpKind::Retain, OpKind::Delete | OpKind::Apply) => {
                push_op(&mut result, iter_b.take(min)?);
                iter_a.take(min)?;
            }
            // b's delete clobbers a's apply
            (OpKind::Apply, OpKind::Delete) => {
                push_op(&mut result, iter_b.take(min)?);
                iter_a.take(min)?;
            }
            // b edits the element a inserted: fold b's nested delta into it
            (OpKind::Insert, OpKind::Apply) => {
                let inserted = iter_a.take(1)?;
                let edit = iter_b.take(1)?;
                let (ListOp::Insert(values), ListOp::Apply { subtype, delta: nested }) =
                    (inserted, edit)
                else {
                    return Err(DeltaError::Malformed("mismatched op pair".into()));
                };
                let Some(value) = values.first() else {
                    return Err(DeltaError::Malformed("empty insert".into()));
                };
                let ty = registry.get(&subtype)?;
                let applied = ty.apply(value, &nested, registry)?;
                push_op(&mut result, ListOp::Insert(vec![applied]));
            }
            // nested deltas compose through their subtype
            (OpKind::Apply, OpKind::Apply) => {
                let op_a = iter_a.take(len_a)?;
                let op_b = iter_b.take(len_b)?;
                let (
                    ListOp::Apply { subtype: sub_a, delta: nested_a },
                    ListOp::Apply { subtype: sub_b, delta: nested_b },
                ) = (op_a, op_b)
                else {
                    return Err(DeltaError::Malformed("mismatched op pair".into()));
                };
                if sub_a != sub_b {
                    return Err(DeltaError::SubtypeMismatch {
                        verb: "compose",
                        ours: sub_a,
                        theirs: sub_b,
                    });
                }
                let ty = registry.get(&sub_a)?;
                let composed = ty.compose(&nested_a, &nested_b, registry)?;
                push_op(&mut result, ListOp::Apply { subtype: sub_a, delta: composed });
            }
            (kind_a, kind_b) => {
                return Err(DeltaError::Malformed(format!(
                    "cannot compose op pair: {kind_a}, {kind_b}"
                )));
            }
        }
    }

    delta::chop(&mut result);
    Ok(result)
}

pub fn transform(
    ours: &[ListOp],
    theirs: &[ListOp],
    side: Side,
    registry: &Registry,
) -> Result<Vec<ListOp>> {
    let ours = normalize(ours);
    let theirs = normalize(theirs);
    let mut result: Vec<ListOp> = Vec::new();
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
                    push_op(&mut result, ListOp::Retain(len_theirs));
                    push_op(&mut result, iter_ours.take(len_ours)?);
                    iter_theirs.take(len_theirs)?;
                }
            }
            // our insert lands before their op
            (OpKind::Insert, OpKind::Retain | OpKind::Delete | OpKind::Apply) => {
                push_op(&mut result, iter_ours.take(len_ours)?);
            }
            // shift past the span they inserted
            (OpKind::Retain | OpKind::Delete | OpKind::Apply, OpKind::Insert) => {
                push_op(&mut result, ListOp::Retain(len_theirs));
                iter_theirs.take(len_theirs)?;
            }
            // their delete already removed the span our op touched
            (OpKind::Retain | OpKind::Delete | OpKind::Apply, OpKind::Delete) => {
                iter_ours.take(min)?;
                iter_theirs.take(min)?;
            }
            // our op consumes their retain; their apply keeps its element in
            // place, so our retain or delete passes over it unchanged
            (OpKind::Retain | OpKind::Delete, OpKind::Retain | OpKind::Apply) => {
                push_op(&mut result, iter_ours.take(min)?);
                iter_theirs.take(min)?;
            }
            (OpKind::Apply, OpKind::Retain) => {
                push_op(&mut result, iter_ours.take(min)?);
                iter_theirs.take(min)?;
            }
            // nested deltas transform through their subtype, same side
            (OpKind::Apply, OpKind::Apply) => {
                let op_ours = iter_ours.take(len_ours)?;
                let op_theirs = iter_theirs.take(len_theirs)?;
                let (
                    ListOp::Apply { subtype: sub_ours, delta: nested_ours },
                    ListOp::Apply { subtype: sub_theirs, delta: nested_theirs },
                ) = (op_ours, op_theirs)
                else {
                    return Err(DeltaError::Malformed("mismatched op pair".into()));
                };
                if sub_ours != sub_theirs {
                    return Err(DeltaError::SubtypeMismatch {
                        verb: "transform",
                        ours: sub_ours,
                        theirs: sub_theirs,
                    });
                }
                let ty = registry.get(&sub_ours)?;
                let transformed = ty.transform(&nested_ours, &nested_theirs, side, registry)?;
                push_op(
                    &mut result,
                    ListOp::Apply { subtype: sub_ours, delta: transformed },
                );
            }
            (kind_ours, kind_theirs) => {
                return Err(DeltaError::Malformed(format!(
                    "cannot transform op pair: {kind_ours}, {kind_theirs}"
                )));
            }
        }
    }

    delta::chop(&mut result);
    Ok(result)
}

// ── Wire format ───────────────────────────────────────────────────────────

fn decode_count(parts: &[Value], tag: &str) -> Result<usize> {
    match parts {
        [_, Value::Number(n)] => match n.as_u64() {
            Some(count) => Ok(count as usize),
            None => Err(DeltaError::Malformed(format!(
                "{tag} count must be a non-negative integer, got {n}"
            ))),
        },
        _ => Err(DeltaError::Malformed(format!(
            "{tag} op must carry exactly one count"
        ))),
    }
}

fn decode_key(parts: &[Value], tag: &str) -> Result<String> {
    match parts {
        [_, Value::String(key)] => Ok(key.clone()),
        _ => Err(DeltaError::Malformed(format!(
            "{tag} op must carry exactly one string key"
        ))),
    }
}

fn decode_op(value: &Value) -> Result<ListOp> {
    let Value::Array(parts) = value else {
        return Err(DeltaError::Malformed(format!(
            "list op must be a tagged tuple, got {value}"
        )));
    };
    let Some(Value::String(tag)) = parts.first() else {
        return Err(DeltaError::Malformed(format!(
            "list op must start with a tag, got {value}"
        )));
    };
    match tag.as_str() {
        "retain" => Ok(ListOp::Retain(decode_count(parts, "retain")?)),
        "delete" => Ok(ListOp::Delete(decode_count(parts, "delete")?)),
        "insert" => Ok(ListOp::Insert(parts[1..].to_vec())),
        "apply" => match &parts[1..] {
            [Value::String(subtype), delta] => Ok(ListOp::Apply {
                subtype: subtype.clone(),
                delta: delta.clone(),
            }),
            _ => Err(DeltaError::Malformed(
                "apply op must carry a subtype name and a delta".into(),
            )),
        },
        "cut" => Ok(ListOp::Cut(decode_key(parts, "cut")?)),
        "paste" => Ok(ListOp::Paste(decode_key(parts, "paste")?)),
        other => Err(DeltaError::Malformed(format!("unknown op tag: {other}"))),
    }
}

pub fn decode_delta(value: &Value) -> Result<Vec<ListOp>> {
    let Value::Array(ops) = value else {
        return Err(DeltaError::Malformed(format!(
            "list delta must be an array, got {value}"
        )));
    };
    ops.iter().map(decode_op).collect()
}

fn encode_op(op: &ListOp) -> Value {
    match op {
        ListOp::Retain(n) => Value::Array(vec!["retain".into(), Value::from(*n as u64)]),
        ListOp::Delete(n) => Value::Array(vec!["delete".into(), Value::from(*n as u64)]),
        ListOp::Insert(values) => {
            let mut parts = Vec::with_capacity(values.len() + 1);
            parts.push("insert".into());
            parts.extend(values.iter().cloned());
            Value::Array(parts)
        }
        ListOp::Apply { subtype, delta } => Value::Array(vec![
            "apply".into(),
            Value::String(subtype.clone()),
            delta.clone(),
        ]),
        ListOp::Cut(key) => Value::Array(vec!["cut".into(), Value::String(key.clone())]),
        ListOp::Paste(key) => Value::Array(vec!["paste".into(), Value::String(key.clone())]),
    }
}

pub fn encode_delta(ops: &[ListOp]) -> Value {
    Value::Array(ops.iter().map(encode_op).collect())
}

/// Registry entry for the list type.
pub struct ListType;

impl OtType for ListType {
    fn name(&self) -> &'static str {
        NAME
    }

    fn uri(&self) -> Option<&'static str> {
        Some(URI)
    }

    fn create(&self, initial: Option<&Value>) -> Result<Value> {
        match initial {
            None => Ok(Value::Array(Vec::new())),
            Some(Value::Array(values)) => Ok(Value::Array(values.clone())),
            Some(other) => Err(DeltaError::Malformed(format!(
                "list snapshot must be an array, got {other}"
            ))),
        }
    }

    fn apply(&self, snapshot: &Value, delta: &Value, registry: &Registry) -> Result<Value> {
        let Value::Array(list) = snapshot else {
            return Err(DeltaError::Malformed(format!(
                "list snapshot must be an array, got {snapshot}"
            )));
        };
        Ok(Value::Array(apply(list, &decode_delta(delta)?, registry)?))
    }

    fn compose(&self, a: &Value, b: &Value, registry: &Registry) -> Result<Value> {
        Ok(encode_delta(&compose(
            &decode_delta(a)?,
            &decode_delta(b)?,
            registry,
        )?))
    }

    fn transform(
        &self,
        ours: &Value,
        theirs: &Value,
        side: Side,
        registry: &Registry,
    ) -> Result<Value> {
        Ok(encode_delta(&transform(
            &decode_delta(ours)?,
            &decode_delta(theirs)?,
            side,
            registry,
        )?))
    }

    fn normalize(&self, delta: &Value) -> Result<Value> {
        Ok(encode_delta(&normalize(&decode_delta(delta)?)))
    }
}

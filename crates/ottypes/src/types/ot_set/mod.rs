//! Unordered membership set.
//!
//! A delta is a pair of member collections, `add` and `del`. Members are
//! arbitrary values keyed by their canonical encoding, so structurally
//! equal members collide as intended and serialization has a stable order.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{DeltaError, Result};
use crate::ot_type::{OtType, Side};
use crate::registry::Registry;
use crate::stable;

pub const NAME: &str = "set";
pub const URI: &str = "https://github.com/nicoth-in/ottypes-rs/set";

/// Members keyed by canonical encoding.
pub type SetSnapshot = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SetDelta {
    pub add: Vec<Value>,
    pub del: Vec<Value>,
}

fn keyed(items: &[Value]) -> BTreeMap<String, Value> {
    items
        .iter()
        .map(|item| (stable::stringify(item), item.clone()))
        .collect()
}

pub fn create(initial: &[Value]) -> SetSnapshot {
    keyed(initial)
}

/// Canonicalize: dedup and sort both collections, with an add taking
/// precedence over a delete of the same member.
pub fn normalize(delta: &SetDelta) -> SetDelta {
    let add = keyed(&delta.add);
    let mut del = keyed(&delta.del);
    for key in add.keys() {
        del.remove(key);
    }
    SetDelta {
        add: add.into_values().collect(),
        del: del.into_values().collect(),
    }
}

pub fn apply(set: &SetSnapshot, delta: &SetDelta) -> SetSnapshot {
    let delta = normalize(delta);
    let mut result = set.clone();
    for item in &delta.add {
        result.insert(stable::stringify(item), item.clone());
    }
    for item in &delta.del {
        result.remove(&stable::stringify(item));
    }
    result
}

/// Sequential merge: B's adds and deletes supersede A's where they touch
/// the same member.
pub fn compose(a: &SetDelta, b: &SetDelta) -> SetDelta {
    let a = normalize(a);
    let b = normalize(b);
    let b_add = keyed(&b.add);
    let b_del = keyed(&b.del);

    let mut add = keyed(&a.add);
    for key in b_del.keys() {
        add.remove(key);
    }
    add.extend(b_add.clone());

    let mut del = keyed(&a.del);
    for key in b_add.keys() {
        del.remove(key);
    }
    del.extend(b_del);

    normalize(&SetDelta {
        add: add.into_values().collect(),
        del: del.into_values().collect(),
    })
}

/// Drop the parts of `ours` that `theirs` already covered. The right side
/// drops its duplicates of theirs' ops; the left side yields its half of
/// any add/del conflict on one member, so the right side's op wins it.
pub fn transform(ours: &SetDelta, theirs: &SetDelta, side: Side) -> SetDelta {
    let ours = normalize(ours);
    let theirs = normalize(theirs);
    let mut add = keyed(&ours.add);
    let mut del = keyed(&ours.del);
    match side {
        Side::Left => {
            for key in keyed(&theirs.del).keys() {
                add.remove(key);
            }
            for key in keyed(&theirs.add).keys() {
                del.remove(key);
            }
        }
        Side::Right => {
            for key in keyed(&theirs.add).keys() {
                add.remove(key);
            }
            for key in keyed(&theirs.del).keys() {
                del.remove(key);
            }
        }
    }
    SetDelta {
        add: add.into_values().collect(),
        del: del.into_values().collect(),
    }
}

// ── Wire format ───────────────────────────────────────────────────────────

fn decode_members(object: &Map<String, Value>, field: &str) -> Result<Vec<Value>> {
    match object.get(field) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(other) => Err(DeltaError::Malformed(format!(
            "set delta field '{field}' must be an array, got {other}"
        ))),
    }
}

pub fn decode_delta(value: &Value) -> Result<SetDelta> {
    let Value::Object(object) = value else {
        return Err(DeltaError::Malformed(format!(
            "set delta must be an object, got {value}"
        )));
    };
    Ok(SetDelta {
        add: decode_members(object, "add")?,
        del: decode_members(object, "del")?,
    })
}

pub fn encode_delta(delta: &SetDelta) -> Value {
    let mut object = Map::new();
    object.insert("add".into(), Value::Array(delta.add.clone()));
    object.insert("del".into(), Value::Array(delta.del.clone()));
    Value::Object(object)
}

/// Snapshot to a sorted member array.
pub fn serialize(set: &SetSnapshot) -> Value {
    Value::Array(set.values().cloned().collect())
}

pub fn deserialize(data: &Value) -> Result<SetSnapshot> {
    match data {
        Value::Array(items) => Ok(keyed(items)),
        other => Err(DeltaError::Malformed(format!(
            "set snapshot must be an array, got {other}"
        ))),
    }
}

/// Registry entry for the set type.
pub struct SetType;

impl OtType for SetType {
    fn name(&self) -> &'static str {
        NAME
    }

    fn uri(&self) -> Option<&'static str> {
        Some(URI)
    }

    fn create(&self, initial: Option<&Value>) -> Result<Value> {
        match initial {
            None => Ok(Value::Array(Vec::new())),
            Some(value) => Ok(serialize(&deserialize(value)?)),
        }
    }

    fn apply(&self, snapshot: &Value, delta: &Value, _registry: &Registry) -> Result<Value> {
        let set = deserialize(snapshot)?;
        let delta = decode_delta(delta)?;
        Ok(serialize(&apply(&set, &delta)))
    }

    fn compose(&self, a: &Value, b: &Value, _registry: &Registry) -> Result<Value> {
        Ok(encode_delta(&compose(&decode_delta(a)?, &decode_delta(b)?)))
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
        )))
    }

    fn normalize(&self, delta: &Value) -> Result<Value> {
        Ok(encode_delta(&normalize(&decode_delta(delta)?)))
    }

    fn serialize(&self, snapshot: &Value) -> Result<Value> {
        Ok(serialize(&deserialize(snapshot)?))
    }

    fn deserialize(&self, data: &Value) -> Result<Value> {
        Ok(serialize(&deserialize(data)?))
    }
}

//! Key → value mapping with key add/remove deltas.
//!
//! A delta carries `add` entries and `del` keys. Compose starts from the
//! later delta and keeps the earlier delta's entries it does not override;
//! transform resolves concurrent writes to one key in the left side's
//! favor.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::{Map, Value};

use crate::error::{DeltaError, Result};
use crate::ot_type::{OtType, Side};
use crate::registry::Registry;

pub const NAME: &str = "map";
pub const URI: &str = "https://github.com/nicoth-in/ottypes-rs/map";

pub type MapSnapshot = BTreeMap<String, Value>;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapDelta {
    pub add: BTreeMap<String, Value>,
    pub del: BTreeSet<String>,
}

pub fn create(initial: &MapSnapshot) -> MapSnapshot {
    initial.clone()
}

/// Canonicalize: an add takes precedence over a delete of the same key.
pub fn normalize(delta: &MapDelta) -> MapDelta {
    let add = delta.add.clone();
    let del = delta
        .del
        .iter()
        .filter(|key| !add.contains_key(*key))
        .cloned()
        .collect();
    MapDelta { add, del }
}

pub fn apply(map: &MapSnapshot, delta: &MapDelta) -> MapSnapshot {
    let delta = normalize(delta);
    let mut result = map.clone();
    for (key, value) in &delta.add {
        result.insert(key.clone(), value.clone());
    }
    for key in &delta.del {
        result.remove(key);
    }
    result
}

/// Sequential merge: start from B, keep A's entries B does not override.
pub fn compose(a: &MapDelta, b: &MapDelta) -> MapDelta {
    let a = normalize(a);
    let b = normalize(b);
    let mut add = b.add.clone();
    let mut del = b.del.clone();
    for key in &a.del {
        if !add.contains_key(key) && !del.contains(key) {
            del.insert(key.clone());
        }
    }
    for (key, value) in &a.add {
        if !add.contains_key(key) && !del.contains(key) {
            add.insert(key.clone(), value.clone());
        }
    }
    MapDelta { add, del }
}

/// The left side keeps its delta untouched; the right side drops every key
/// the left side already wrote or removed.
pub fn transform(ours: &MapDelta, theirs: &MapDelta, side: Side) -> MapDelta {
    let mut ours = normalize(ours);
    if side == Side::Right {
        let theirs = normalize(theirs);
        for key in theirs.add.keys() {
            ours.add.remove(key);
            ours.del.remove(key);
        }
        for key in &theirs.del {
            ours.add.remove(key);
        }
    }
    ours
}

// ── Wire format ───────────────────────────────────────────────────────────

pub fn decode_delta(value: &Value) -> Result<MapDelta> {
    let Value::Object(object) = value else {
        return Err(DeltaError::Malformed(format!(
            "map delta must be an object, got {value}"
        )));
    };
    let add = match object.get("add") {
        None => BTreeMap::new(),
        Some(Value::Object(entries)) => entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
        Some(other) => {
            return Err(DeltaError::Malformed(format!(
                "map delta field 'add' must be an object, got {other}"
            )))
        }
    };
    let del = match object.get("del") {
        None => BTreeSet::new(),
        Some(Value::Array(keys)) => {
            let mut del = BTreeSet::new();
            for key in keys {
                match key {
                    Value::String(key) => {
                        del.insert(key.clone());
                    }
                    other => {
                        return Err(DeltaError::Malformed(format!(
                            "map delta key must be a string, got {other}"
                        )))
                    }
                }
            }
            del
        }
        Some(other) => {
            return Err(DeltaError::Malformed(format!(
                "map delta field 'del' must be an array, got {other}"
            )))
        }
    };
    Ok(MapDelta { add, del })
}

pub fn encode_delta(delta: &MapDelta) -> Value {
    let mut object = Map::new();
    object.insert(
        "add".into(),
        Value::Object(
            delta
                .add
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
    );
    object.insert(
        "del".into(),
        Value::Array(delta.del.iter().cloned().map(Value::String).collect()),
    );
    Value::Object(object)
}

pub fn serialize(map: &MapSnapshot) -> Value {
    Value::Object(
        map.iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect(),
    )
}

pub fn deserialize(data: &Value) -> Result<MapSnapshot> {
    match data {
        Value::Object(entries) => Ok(entries
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()),
        other => Err(DeltaError::Malformed(format!(
            "map snapshot must be an object, got {other}"
        ))),
    }
}

/// Registry entry for the map type.
pub struct MapType;

impl OtType for MapType {
    fn name(&self) -> &'static str {
        NAME
    }

    fn uri(&self) -> Option<&'static str> {
        Some(URI)
    }

    fn create(&self, initial: Option<&Value>) -> Result<Value> {
        match initial {
            None => Ok(Value::Object(Map::new())),
            Some(value) => Ok(serialize(&deserialize(value)?)),
        }
    }

    fn apply(&self, snapshot: &Value, delta: &Value, _registry: &Registry) -> Result<Value> {
        let map = deserialize(snapshot)?;
        let delta = decode_delta(delta)?;
        Ok(serialize(&apply(&map, &delta)))
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
}

//! Opaque last-writer-wins scalar.
//!
//! The delta is the replacement value itself. Compose keeps the later
//! write; transform resolves concurrent writes by side, so after exchange
//! both replicas hold the left author's value.

use serde_json::Value;

use crate::error::Result;
use crate::ot_type::{OtType, Side};
use crate::registry::Registry;

pub const NAME: &str = "register";
pub const URI: &str = "https://github.com/nicoth-in/ottypes-rs/register";

pub fn create(initial: Option<&Value>) -> Value {
    initial.cloned().unwrap_or(Value::Null)
}

pub fn apply(_snapshot: &Value, delta: &Value) -> Value {
    delta.clone()
}

pub fn compose(_a: &Value, b: &Value) -> Value {
    b.clone()
}

pub fn transform(ours: &Value, theirs: &Value, side: Side) -> Value {
    match side {
        Side::Left => ours.clone(),
        Side::Right => theirs.clone(),
    }
}

/// Registry entry for the register type.
pub struct RegisterType;

impl OtType for RegisterType {
    fn name(&self) -> &'static str {
        NAME
    }

    fn uri(&self) -> Option<&'static str> {
        Some(URI)
    }

    fn create(&self, initial: Option<&Value>) -> Result<Value> {
        Ok(create(initial))
    }

    fn apply(&self, snapshot: &Value, delta: &Value, _registry: &Registry) -> Result<Value> {
        Ok(apply(snapshot, delta))
    }

    fn compose(&self, a: &Value, b: &Value, _registry: &Registry) -> Result<Value> {
        Ok(compose(a, b))
    }

    fn transform(
        &self,
        ours: &Value,
        theirs: &Value,
        side: Side,
        _registry: &Registry,
    ) -> Result<Value> {
        Ok(transform(ours, theirs, side))
    }
}

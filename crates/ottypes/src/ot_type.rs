//! The capability surface a registered type exposes.

use serde_json::Value;

use crate::error::Result;
use crate::registry::Registry;

/// Tie-break side for transforming concurrent deltas.
///
/// By convention the left side's insert lands first; the right side shifts
/// past it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn is_left(self) -> bool {
        matches!(self, Side::Left)
    }
}

/// A mergeable delta type, dispatched by name through the [`Registry`].
///
/// Snapshots and deltas cross this boundary as plain structured data
/// ([`serde_json::Value`]) — the same shape used for storage or
/// transmission, and the shape nested payloads take inside a list's apply
/// op. Implementations that need subtype dispatch receive the registry as a
/// read-only capability.
pub trait OtType: Send + Sync {
    /// Short name the type registers under.
    fn name(&self) -> &'static str;

    /// Canonical URI the type also registers under.
    fn uri(&self) -> Option<&'static str> {
        None
    }

    /// Build an initial snapshot; empty when `initial` is absent.
    fn create(&self, initial: Option<&Value>) -> Result<Value>;

    /// Materialize `delta` against `snapshot`, returning the new snapshot.
    fn apply(&self, snapshot: &Value, delta: &Value, registry: &Registry) -> Result<Value>;

    /// Collapse two sequential deltas into one equivalent delta.
    fn compose(&self, a: &Value, b: &Value, registry: &Registry) -> Result<Value>;

    /// Re-express `ours` so it applies after the concurrent `theirs`.
    fn transform(&self, ours: &Value, theirs: &Value, side: Side, registry: &Registry)
        -> Result<Value>;

    /// Canonicalize a delta. Types whose deltas are canonical by
    /// construction return them unchanged.
    fn normalize(&self, delta: &Value) -> Result<Value> {
        Ok(delta.clone())
    }

    /// Snapshot to plain structured data.
    fn serialize(&self, snapshot: &Value) -> Result<Value> {
        Ok(snapshot.clone())
    }

    /// Plain structured data back to a snapshot.
    fn deserialize(&self, data: &Value) -> Result<Value> {
        Ok(data.clone())
    }
}

impl std::fmt::Debug for dyn OtType + '_ {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OtType").field("name", &self.name()).finish()
    }
}

//! Op grammar, canonicalization and the lock-step delta cursor.
//!
//! Every sequence type is built from the same three pieces: a measured op
//! grammar ([`DeltaOp`]), a canonicalizing push ([`push_op`]/[`normalize`])
//! and a cursor ([`DeltaIter`]) that consumes ops unit-by-unit, padding past
//! the end of the sequence with an unbounded retain.

use std::fmt;

use crate::error::Result;

// ── Op kinds ──────────────────────────────────────────────────────────────

/// The kind of an atomic op. Each concrete type uses a subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Retain,
    Insert,
    Delete,
    Apply,
    Cut,
    Paste,
}

impl OpKind {
    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Retain => "retain",
            OpKind::Insert => "insert",
            OpKind::Delete => "delete",
            OpKind::Apply => "apply",
            OpKind::Cut => "cut",
            OpKind::Paste => "paste",
        }
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Op grammar ────────────────────────────────────────────────────────────

/// Contract every op grammar implements: a measured length, slicing for
/// partial consumption, and merging of adjacent same-kind runs.
pub trait DeltaOp: Clone {
    fn kind(&self) -> OpKind;

    /// Units of the lock-step walk this op covers: the snapshot span it
    /// consumes, or for an insert the run of values it produces.
    fn len(&self) -> usize;

    /// A contiguous sub-run of this op. Indivisible ops (apply, cut) only
    /// slice to their full length; a partial slice is a malformed delta.
    fn slice(&self, offset: usize, len: usize) -> Result<Self>;

    /// The synthesized op used to pad past the end of a delta.
    fn retain(len: usize) -> Self;

    /// Fold an adjacent op of the same kind into this one.
    fn merge(&mut self, other: &Self);

    /// True when this cut and the following paste name the same key.
    fn cancels(&self, next: &Self) -> bool {
        let _ = next;
        false
    }
}

// ── Normalizer ────────────────────────────────────────────────────────────

/// Push `op` onto `ops`, keeping the sequence canonical:
///
/// - zero-length retains/deletes and empty inserts are dropped;
/// - adjacent same-kind runs merge;
/// - a delete moves in front of the insert it follows (canonical order at
///   one position is delete, insert, apply), merging into a delete two
///   positions back when present;
/// - a cut immediately followed by a paste of the same key collapses to a
///   single retain.
pub fn push_op<T: DeltaOp>(ops: &mut Vec<T>, op: T) {
    let kind = op.kind();
    if matches!(kind, OpKind::Retain | OpKind::Delete | OpKind::Insert) && op.len() == 0 {
        return;
    }
    if let Some(last) = ops.last_mut() {
        let last_kind = last.kind();
        if last_kind == kind && matches!(kind, OpKind::Retain | OpKind::Delete | OpKind::Insert) {
            last.merge(&op);
            return;
        }
        if last_kind == OpKind::Insert && kind == OpKind::Delete {
            let at = ops.len() - 1;
            if at > 0 && ops[at - 1].kind() == OpKind::Delete {
                ops[at - 1].merge(&op);
            } else {
                ops.insert(at, op);
            }
            return;
        }
        if last_kind == OpKind::Cut && kind == OpKind::Paste && last.cancels(&op) {
            ops.pop();
            push_op(ops, T::retain(1));
            return;
        }
    }
    ops.push(op);
}

/// Strip trailing retains; the snapshot tail an edit keeps is implicit.
pub fn chop<T: DeltaOp>(ops: &mut Vec<T>) {
    while matches!(ops.last().map(DeltaOp::kind), Some(OpKind::Retain)) {
        ops.pop();
    }
}

/// Rebuild a delta in canonical form. Idempotent.
pub fn normalize<T: DeltaOp>(ops: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut result = Vec::new();
    for op in ops {
        push_op(&mut result, op);
    }
    chop(&mut result);
    result
}

// ── Cursor ────────────────────────────────────────────────────────────────

/// Stateful single-pass cursor over a normalized delta.
///
/// Past the end of the sequence the cursor reports an unbounded retain, so a
/// lock-step walk of two deltas of different measured lengths never runs
/// out. This is the sole mechanism compose and transform read a delta
/// through.
pub struct DeltaIter<'a, T> {
    ops: &'a [T],
    index: usize,
    offset: usize,
}

impl<'a, T: DeltaOp> DeltaIter<'a, T> {
    pub fn new(ops: &'a [T]) -> Self {
        Self { ops, index: 0, offset: 0 }
    }

    pub fn has_next(&self) -> bool {
        self.index < self.ops.len()
    }

    /// Kind of the op under the cursor; retain past the end.
    pub fn peek_kind(&self) -> OpKind {
        match self.ops.get(self.index) {
            Some(op) => op.kind(),
            None => OpKind::Retain,
        }
    }

    /// Remaining length of the op under the cursor; unbounded past the end.
    pub fn peek_len(&self) -> usize {
        match self.ops.get(self.index) {
            Some(op) => op.len() - self.offset,
            None => usize::MAX,
        }
    }

    /// Consume up to `count` units, never crossing an op boundary. Past the
    /// end of the sequence a `retain(count)` is synthesized.
    pub fn take(&mut self, count: usize) -> Result<T> {
        let Some(op) = self.ops.get(self.index) else {
            return Ok(T::retain(count));
        };
        let slice = op.slice(self.offset, count)?;
        if self.offset.saturating_add(count) < op.len() {
            self.offset += count;
        } else {
            self.index += 1;
            self.offset = 0;
        }
        Ok(slice)
    }
}

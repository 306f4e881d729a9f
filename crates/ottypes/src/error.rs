//! Error taxonomy shared by every delta type.

use thiserror::Error;

/// Why a delta could not be reconciled against a snapshot or another delta.
///
/// All errors are raised synchronously at detection. The core never retries
/// or partially recovers; callers decide whether to reject the edit or
/// request a fresh snapshot. Snapshots are borrowed immutably, so a failed
/// apply leaves the original intact.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DeltaError {
    /// An op violates its grammar: a partial slice of an indivisible op, a
    /// duplicate cut key, a paste with no matching cut, an undecodable wire
    /// shape, or an op pair compose/transform refuse to reconcile.
    #[error("malformed delta: {0}")]
    Malformed(String),

    /// An op consumes more of the snapshot than remains.
    #[error("op of length {len} exceeds the remaining snapshot length {remaining}")]
    Range { len: usize, remaining: usize },

    /// An apply op names a subtype absent from the registry.
    #[error("unknown subtype: {0}")]
    UnknownSubtype(String),

    /// Two apply ops at matching positions name different subtypes.
    #[error("cannot {verb} apply ops with different subtypes: {ours}, {theirs}")]
    SubtypeMismatch {
        verb: &'static str,
        ours: String,
        theirs: String,
    },
}

pub type Result<T> = std::result::Result<T, DeltaError>;

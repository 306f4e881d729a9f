//! Mergeable delta types for collaborative editing.
//!
//! Each type pairs a snapshot with a delta format and three operations:
//! `apply` materializes a delta against a snapshot, `compose` folds two
//! sequential deltas into one, and `transform` re-expresses a delta so it
//! can land after a concurrent one while every replica converges on the
//! same final state regardless of application order.
//!
//! Five concrete types share one substrate of measured ops, canonicalizing
//! normalization and lock-step iteration:
//!
//! - `register` — opaque last-writer-wins scalar
//! - `set` — membership adds and removes
//! - `map` — key adds and removes
//! - `string` — character sequence with retain/insert/delete
//! - `list` — arbitrary-element sequence with retain/insert/delete, nested
//!   subtype edits, and cut/paste moves
//!
//! Nested sub-documents dispatch through a [`Registry`] of [`OtType`]
//! implementations, built once at startup and threaded through every call
//! that may reach a subtype.

pub mod delta;
pub mod error;
pub mod ot_type;
pub mod registry;
pub mod stable;
pub mod types;

pub use error::DeltaError;
pub use ot_type::{OtType, Side};
pub use registry::Registry;

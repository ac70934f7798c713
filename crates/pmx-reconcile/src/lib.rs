//! pmx-reconcile
//!
//! Parameter-tree reconciliation.
//!
//! Rules:
//! - Destination-rooted: destination nodes are never added, removed or replaced.
//! - Children are matched by label only; position is irrelevant.
//! - Headers adopt the source identity, collections recurse, leaves adopt the
//!   source value when it coerces into the destination shape.
//! - Type/value incompatibilities are recorded and the merge continues.
//! - Source children without a destination match are dropped silently
//!   (older saved trees against newer module definitions).
//! - Not transactional: copies made before a mismatch are kept.
//!
//! Deterministic, pure logic. No IO.

mod engine;
mod types;

pub use engine::{reconcile, reconcile_nodes};
pub use types::*;

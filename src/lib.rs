//! # A delta-state CRDT engine for JSON-shaped data
//!
//! Many replicas concurrently mutate a nested JSON value — maps, ordered
//! arrays, multi-value registers — and later exchange *deltas* that, when
//! merged, drive every replica to the same state without coordination.
//!
//! The core is a layered algebra:
//!
//! 1. [`Dot`] — a pair `(replicaId, seq)` uniquely identifying one write.
//! 2. [`CausalContext`] — a compact set of dots: the "knowledge" of a state
//!    or delta.
//! 3. [`DotStore`] — one of three variants embedding dots into data: `Fun`
//!    (register cells), `FunMap` (dot-keyed value-states), `Map` (generic
//!    key-keyed nested stores, tagged with a CRDT typename).
//! 4. The [`mvreg`], [`ewflag`], [`ormap`] and [`orarray`] modules: pure
//!    functions that, given a state and operation arguments, return a delta
//!    of the same shape.
//! 5. [`Position`] — a dense, totally-ordered identifier used as
//!    `ORArray`'s sort key.
//!
//! A typical session: call an operator against a local [`State`], obtain a
//! [`Delta`], `join` it into the state, ship it to peers; peers `join` it
//! into theirs. Convergence follows entirely from `join` being a
//! commutative, associative, idempotent merge — this crate never needs a
//! consensus round or a central sequencer.
//!
//! ## What this crate is not
//!
//! There is no network transport, no durability layer, no access control,
//! no schema validation, and no particular wire format: those are host
//! concerns, built on top of [`State::delta_since`] and [`State::join`].

mod causal_context;
mod dot;
mod dotstore;
mod error;
mod ewflag;
mod mvreg;
mod ormap;
mod orarray;
mod position;
mod state;
mod value;

pub use crate::causal_context::CausalContext;
pub use crate::dot::{Dot, ReplicaId};
pub use crate::dotstore::{CrdtKind, DotStore, MapKey, Payload, Slot};
pub use crate::error::CrdtError;
pub use crate::mvreg::{Delta, StateRef};
pub use crate::position::Position;
pub use crate::state::State;

pub use crate::ewflag as ew_flag;
pub use crate::mvreg as mv_reg;
pub use crate::orarray as or_array;
pub use crate::ormap as or_map;

/// Renders a state as a plain JSON value: objects from `ORMap`, arrays from
/// `ORArray`, and — wherever concurrent writes leave more than one
/// surviving value — a JSON array standing in for the multi-value set.
pub fn value<I: ReplicaId>(state: &State<I>) -> Result<serde_json::Value, CrdtError> {
    crate::value::to_json(state.store(), state.causal_context())
}

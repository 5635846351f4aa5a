//! ORArray: an observed-remove ordered array with move. Each element is a
//! uid-keyed child with two MVReg-like slots: FIRST holds the element's
//! `Position`(s), SECOND its value(s). The visible order is a pure function
//! of the joined state — `(minimal FIRST position, uid)` — never of which
//! replica computed it or the order deltas arrived in.
use crate::causal_context::CausalContext;
use crate::dot::ReplicaId;
use crate::dotstore::{CrdtKind, DotStore, MapKey, Payload, Slot};
use crate::error::CrdtError;
use crate::mvreg::{self, Delta, StateRef};
use crate::position::Position;
use std::collections::BTreeMap;

fn as_map<I: ReplicaId>(
    store: &DotStore<I>,
) -> Result<&BTreeMap<MapKey, DotStore<I>>, CrdtError> {
    match store {
        DotStore::Map(CrdtKind::ORArray, m) => Ok(m),
        other => Err(CrdtError::TypeMismatch(format!(
            "expected orarray, found {:?}",
            other
        ))),
    }
}

fn slot_or_empty<'a, I: ReplicaId>(
    child: Option<&'a DotStore<I>>,
    empty: &'a DotStore<I>,
) -> &'a DotStore<I> {
    child.unwrap_or(empty)
}

fn first<'a, I: ReplicaId>(
    child: &'a DotStore<I>,
    empty: &'a DotStore<I>,
) -> Result<&'a DotStore<I>, CrdtError> {
    match child {
        DotStore::Map(CrdtKind::ORArray, m) => Ok(slot_or_empty(m.get(&MapKey::Slot(Slot::First)), empty)),
        other => Err(CrdtError::TypeMismatch(format!(
            "expected orarray element, found {:?}",
            other
        ))),
    }
}

fn second<'a, I: ReplicaId>(
    child: &'a DotStore<I>,
    empty: &'a DotStore<I>,
) -> Result<&'a DotStore<I>, CrdtError> {
    match child {
        DotStore::Map(CrdtKind::ORArray, m) => Ok(slot_or_empty(m.get(&MapKey::Slot(Slot::Second)), empty)),
        other => Err(CrdtError::TypeMismatch(format!(
            "expected orarray element, found {:?}",
            other
        ))),
    }
}

fn positions_of<I: ReplicaId>(first_store: &DotStore<I>) -> Result<Vec<Position>, CrdtError> {
    match first_store {
        DotStore::Fun(m) => m
            .values()
            .map(|p| match p {
                Payload::Position(pos) => Ok(pos.clone()),
                other => Err(CrdtError::InvalidPosition(format!(
                    "FIRST register holds non-position payload {:?}",
                    other
                ))),
            })
            .collect(),
        other => Err(CrdtError::TypeMismatch(format!(
            "expected dotfun (position register), found {:?}",
            other
        ))),
    }
}

/// Inserts a brand-new element `uid` at `position` with `value`. Mints two
/// fresh dots (one per slot) in one delta.
pub fn insert_value<I: ReplicaId>(
    state: StateRef<'_, I>,
    actor: I,
    uid: &str,
    position: Position,
    value: Payload,
) -> Result<Delta<I>, CrdtError> {
    as_map(state.store)?;
    let dot_pos = state.cc.next(actor);
    let dot_val = dot_pos.succ();
    let first_store = DotStore::Fun(BTreeMap::from([(dot_pos, Payload::Position(position))]));
    let second_store = DotStore::Fun(BTreeMap::from([(dot_val, value)]));
    let child = DotStore::Map(
        CrdtKind::ORArray,
        BTreeMap::from([
            (MapKey::Slot(Slot::First), first_store),
            (MapKey::Slot(Slot::Second), second_store),
        ]),
    );
    let store = DotStore::Map(
        CrdtKind::ORArray,
        BTreeMap::from([(MapKey::Str(uid.to_string()), child)]),
    );
    let cc = [dot_pos, dot_val].into_iter().collect::<CausalContext<I>>();
    Ok(Delta { store, cc })
}

/// Moves an existing element to `new_position`. Fails with `MissingElement`
/// only if `uid` has never been observed at all (absent from the joined
/// `DotMap`); if `uid` is present but its FIRST slot is currently empty
/// (tombstoned by a concurrent delete that this move then out-races), an
/// empty register is constructed and written to rather than dereferenced.
pub fn move_to<I: ReplicaId>(
    state: StateRef<'_, I>,
    actor: I,
    uid: &str,
    new_position: Position,
) -> Result<Delta<I>, CrdtError> {
    let map = as_map(state.store)?;
    let key = MapKey::Str(uid.to_string());
    let child = map
        .get(&key)
        .ok_or_else(|| CrdtError::MissingElement(uid.to_string()))?;
    let empty = DotStore::empty_fun();
    let first_store = first(child, &empty)?;
    let delta = mvreg::write(StateRef::new(first_store, state.cc), actor, Payload::Position(new_position))?;
    let child_delta = DotStore::Map(
        CrdtKind::ORArray,
        BTreeMap::from([(MapKey::Slot(Slot::First), delta.store)]),
    );
    let store = DotStore::Map(CrdtKind::ORArray, BTreeMap::from([(key, child_delta)]));
    Ok(Delta { store, cc: delta.cc })
}

/// Applies `op` to an existing element's SECOND (value) register.
/// `MissingElement` if `uid` has never been observed.
pub fn apply_to_value<I: ReplicaId>(
    state: StateRef<'_, I>,
    uid: &str,
    op: impl FnOnce(StateRef<'_, I>) -> Result<Delta<I>, CrdtError>,
) -> Result<Delta<I>, CrdtError> {
    let map = as_map(state.store)?;
    let key = MapKey::Str(uid.to_string());
    let child = map
        .get(&key)
        .ok_or_else(|| CrdtError::MissingElement(uid.to_string()))?;
    let empty = DotStore::empty_fun();
    let second_store = second(child, &empty)?;
    let delta = op(StateRef::new(second_store, state.cc))?;
    let child_delta = DotStore::Map(
        CrdtKind::ORArray,
        BTreeMap::from([(MapKey::Slot(Slot::Second), delta.store)]),
    );
    let store = DotStore::Map(CrdtKind::ORArray, BTreeMap::from([(key, child_delta)]));
    Ok(Delta { store, cc: delta.cc })
}

/// Observed-remove of `uid`'s position: the delta's context covers every
/// FIRST-slot dot currently observed under it.
///
/// Only FIRST (the position register) is tombstoned here, not SECOND (the
/// value). `value()` hides a uid whose FIRST register is empty regardless of
/// what SECOND still holds, so the element disappears from the visible
/// array — but a concurrent `move_to` mints a fresh FIRST dot this delta's
/// context could never have observed, so the dot-store join lets it
/// through and the element reappears at its new position with its original
/// value intact. This is what makes move win over a concurrent delete:
/// coupling delete to FIRST alone is what lets SECOND survive untouched.
pub fn delete<I: ReplicaId>(state: StateRef<'_, I>, uid: &str) -> Result<Delta<I>, CrdtError> {
    let map = as_map(state.store)?;
    let key = MapKey::Str(uid.to_string());
    let mut dots = Vec::new();
    if let Some(child) = map.get(&key) {
        let empty = DotStore::empty_fun();
        first(child, &empty)?.dots(&mut dots);
    }
    Ok(Delta {
        store: DotStore::empty_map(CrdtKind::ORArray),
        cc: dots.into_iter().collect(),
    })
}

/// The array's current content as `(uid, values)` pairs, ordered by
/// `(minimal FIRST position, uid)` — a pure function of the joined state.
pub fn value<I: ReplicaId>(state: StateRef<'_, I>) -> Result<Vec<(String, Vec<Payload>)>, CrdtError> {
    let map = as_map(state.store)?;
    let empty = DotStore::empty_fun();
    let mut entries = Vec::new();
    for (key, child) in map {
        let uid = match key {
            MapKey::Str(s) => s.clone(),
            MapKey::Slot(_) => continue,
        };
        let first_store = first(child, &empty)?;
        let positions = positions_of(first_store)?;
        let min_pos = match positions.into_iter().min() {
            Some(p) => p,
            None => continue, // FIRST tombstoned with nothing live: not visible.
        };
        let second_store = second(child, &empty)?;
        let values: Vec<Payload> = match second_store {
            DotStore::Fun(m) => m.values().cloned().collect(),
            other => {
                return Err(CrdtError::TypeMismatch(format!(
                    "expected dotfun (value register), found {:?}",
                    other
                )))
            }
        };
        entries.push((min_pos, uid, values));
    }
    entries.sort_by(|(pa, ua, _), (pb, ub, _)| pa.cmp(pb).then_with(|| ua.cmp(ub)));
    Ok(entries.into_iter().map(|(_, uid, values)| (uid, values)).collect())
}

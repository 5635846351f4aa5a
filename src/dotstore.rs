//! The dot-store: a tagged sum type that embeds dots into nested JSON-shaped
//! data, plus the dot-store `join` — commutative, associative, idempotent
//! given the surrounding causal contexts.
use crate::causal_context::CausalContext;
use crate::dot::{Dot, ReplicaId};
use crate::error::CrdtError;
use std::collections::BTreeMap;

/// The CRDT typename tag carried by every [`DotStore::Map`] node, so that a
/// `join` across replicas can detect a typename mismatch (e.g. one replica
/// treating a key as an `ORMap`, the other as an `ORArray`) instead of
/// silently merging incompatible shapes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum CrdtKind {
    /// A [`crate::ormap::ORMap`].
    ORMap,
    /// A [`crate::orarray::ORArray`].
    ORArray,
}

/// The fixed two slots of an `ORArray` element: a position register and a
/// value register.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Slot {
    /// Holds the element's `Position`.
    First,
    /// Holds the element's value.
    Second,
}

/// The key of a [`DotStore::Map`] node. `Str` is used by `ORMap` and by the
/// uid level of `ORArray`; `Slot` is used by the fixed two-slot structure
/// beneath each `ORArray` element.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum MapKey {
    /// A map key (`ORMap`) or an element uid (`ORArray`).
    Str(String),
    /// One of an `ORArray` element's two fixed slots.
    Slot(Slot),
}

impl From<Slot> for MapKey {
    fn from(s: Slot) -> Self {
        MapKey::Slot(s)
    }
}

/// The value carried by a `DotFun` register cell: either a JSON scalar, or
/// (for `ORArray`'s FIRST slot) a `Position`. Kept as one type so MVReg's
/// `join`/`write`/`clear` work uniformly over both uses of a register.
#[derive(Clone, Debug, PartialEq, PartialOrd)]
pub enum Payload {
    /// JSON `null`.
    Null,
    /// JSON boolean.
    Bool(bool),
    /// JSON number, stored as `f64` (JSON's only numeric type).
    Num(f64),
    /// JSON string.
    Str(String),
    /// An `ORArray` element's position.
    Position(crate::position::Position),
}

/// One of the three dot-store variants:
///
/// - [`DotStore::Fun`]: `dot -> payload`, register cells (MVReg).
/// - [`DotStore::FunMap`]: `dot -> value-state`, the value-state itself a
///   `DotStore` (used where a register's "value" is itself a nested
///   CRDT rather than a scalar).
/// - [`DotStore::Map`]: `key -> nested DotStore`, carrying the typename tag
///   of the CRDT operating on it (ORMap or ORArray).
#[derive(Clone, Debug, PartialEq)]
pub enum DotStore<I: ReplicaId> {
    /// Register cells: `dot -> payload`.
    Fun(BTreeMap<Dot<I>, Payload>),
    /// `dot -> value-state`.
    FunMap(BTreeMap<Dot<I>, DotStore<I>>),
    /// `key -> nested DotStore`, tagged with the owning CRDT's typename.
    Map(CrdtKind, BTreeMap<MapKey, DotStore<I>>),
}

impl<I: ReplicaId> DotStore<I> {
    /// An empty register (the default state for a not-yet-written MVReg).
    pub fn empty_fun() -> Self {
        DotStore::Fun(BTreeMap::new())
    }

    /// An empty map of the given kind (the default state for a
    /// not-yet-populated ORMap/ORArray).
    pub fn empty_map(kind: CrdtKind) -> Self {
        DotStore::Map(kind, BTreeMap::new())
    }

    /// An empty store with the same shape (and, for maps, the same kind tag)
    /// as `other`. Used to stand in for an absent side during `join` and to
    /// construct a fresh child without dereferencing a missing one.
    pub fn empty_like(other: &Self) -> Self {
        match other {
            DotStore::Fun(_) => DotStore::Fun(BTreeMap::new()),
            DotStore::FunMap(_) => DotStore::FunMap(BTreeMap::new()),
            DotStore::Map(kind, _) => DotStore::Map(*kind, BTreeMap::new()),
        }
    }

    /// True iff this store carries no dots at all.
    pub fn is_empty(&self) -> bool {
        match self {
            DotStore::Fun(m) => m.is_empty(),
            DotStore::FunMap(m) => m.is_empty(),
            DotStore::Map(_, m) => m.is_empty(),
        }
    }

    /// Collects every dot anywhere in this subtree.
    pub fn dots(&self, out: &mut Vec<Dot<I>>) {
        match self {
            DotStore::Fun(m) => out.extend(m.keys().copied()),
            DotStore::FunMap(m) => {
                for (dot, v) in m {
                    out.push(*dot);
                    v.dots(out);
                }
            }
            DotStore::Map(_, m) => {
                for v in m.values() {
                    v.dots(out);
                }
            }
        }
    }

    fn kind_name(&self) -> &'static str {
        match self {
            DotStore::Fun(_) => "dotfun",
            DotStore::FunMap(_) => "dotfunmap",
            DotStore::Map(CrdtKind::ORMap, _) => "ormap",
            DotStore::Map(CrdtKind::ORArray, _) => "orarray",
        }
    }

    /// Joins `other` (under `other_cc`) into `self` (under `self_cc`).
    ///
    /// A dot survives iff it is present on both sides, or present on one
    /// side and not known to the other side's causal context. `self_cc`/
    /// `other_cc` are *not* mutated here; merging the causal contexts
    /// themselves is the caller's responsibility (see
    /// [`crate::state::State::join`]).
    pub fn join(
        &mut self,
        self_cc: &CausalContext<I>,
        other: &Self,
        other_cc: &CausalContext<I>,
    ) -> Result<(), CrdtError> {
        match (self, other) {
            (DotStore::Fun(a), DotStore::Fun(b)) => {
                for (dot, v) in b {
                    if !a.contains_key(dot) && !self_cc.contains(dot) {
                        a.insert(*dot, v.clone());
                    }
                }
                a.retain(|dot, _| {
                    let keep = b.contains_key(dot) || !other_cc.contains(dot);
                    if !keep {
                        tracing::trace!(?dot, "join: tombstoning observed-removed dot");
                    }
                    keep
                });
                Ok(())
            }
            (DotStore::FunMap(a), DotStore::FunMap(b)) => {
                for (dot, v) in b {
                    if let Some(existing) = a.get_mut(dot) {
                        existing.join(self_cc, v, other_cc)?;
                    } else if !self_cc.contains(dot) {
                        a.insert(*dot, v.clone());
                    }
                }
                a.retain(|dot, _| b.contains_key(dot) || !other_cc.contains(dot));
                Ok(())
            }
            (DotStore::Map(kind_a, a), DotStore::Map(kind_b, b)) => {
                if kind_a != kind_b {
                    tracing::error!("join: typename mismatch {:?} vs {:?}", kind_a, kind_b);
                    return Err(CrdtError::TypeMismatch(format!(
                        "{:?} vs {:?}",
                        kind_a, kind_b
                    )));
                }
                let keys: std::collections::BTreeSet<&MapKey> =
                    a.keys().chain(b.keys()).collect();
                for key in keys {
                    let key = key.clone();
                    match (a.get(&key), b.get(&key)) {
                        (Some(_), Some(other_child)) => {
                            let child = a.get_mut(&key).unwrap();
                            child.join(self_cc, other_child, other_cc)?;
                        }
                        (Some(_), None) => {
                            let empty = DotStore::empty_like(a.get(&key).unwrap());
                            let child = a.get_mut(&key).unwrap();
                            child.join(self_cc, &empty, other_cc)?;
                        }
                        (None, Some(other_child)) => {
                            let mut child = DotStore::empty_like(other_child);
                            child.join(self_cc, other_child, other_cc)?;
                            a.insert(key.clone(), child);
                        }
                        (None, None) => unreachable!(),
                    }
                    if a.get(&key).map(DotStore::is_empty).unwrap_or(false) {
                        tracing::trace!(?key, "join: pruning fully observed-removed key");
                        a.remove(&key);
                    }
                }
                Ok(())
            }
            (a, b) => {
                tracing::error!(
                    "join: structural mismatch {} vs {}",
                    a.kind_name(),
                    b.kind_name()
                );
                Err(CrdtError::TypeMismatch(format!(
                    "{} vs {}",
                    a.kind_name(),
                    b.kind_name()
                )))
            }
        }
    }
}

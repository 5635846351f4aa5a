//! ORMap: an observed-remove map. Children are arbitrary sub-CRDT states
//! (MVReg registers, or nested ORMap/ORArray), giving the engine its
//! recursive, JSON-tree-shaped state.
use crate::causal_context::CausalContext;
use crate::dotstore::{CrdtKind, DotStore, MapKey};
use crate::dot::ReplicaId;
use crate::error::CrdtError;
use crate::mvreg::{Delta, StateRef};

fn as_map<I: ReplicaId>(
    store: &DotStore<I>,
) -> Result<&std::collections::BTreeMap<MapKey, DotStore<I>>, CrdtError> {
    match store {
        DotStore::Map(CrdtKind::ORMap, m) => Ok(m),
        other => Err(CrdtError::TypeMismatch(format!(
            "expected ormap, found {:?}",
            other
        ))),
    }
}

/// Applies `op` to `key`'s child state (or an empty child shaped like
/// `default_child` if `key` is absent), and lifts the resulting delta into a
/// one-key ORMap-shaped delta.
///
/// A concurrent `remove(key)` cannot suppress the write this produces: the
/// write's delta carries a fresh dot the remover's causal context has never
/// seen, so the dot-store join keeps it. This is the add-wins bias.
pub fn apply_to_key<I: ReplicaId>(
    state: StateRef<'_, I>,
    key: &str,
    default_child: DotStore<I>,
    op: impl FnOnce(StateRef<'_, I>) -> Result<Delta<I>, CrdtError>,
) -> Result<Delta<I>, CrdtError> {
    let map = as_map(state.store)?;
    let mapkey = MapKey::Str(key.to_string());
    let child = map.get(&mapkey).unwrap_or(&default_child);
    let child_delta = op(StateRef::new(child, state.cc))?;
    let store = DotStore::Map(
        CrdtKind::ORMap,
        std::collections::BTreeMap::from([(mapkey, child_delta.store)]),
    );
    Ok(Delta {
        store,
        cc: child_delta.cc,
    })
}

/// Removes `key`: a delta with no child for `key`, but whose causal context
/// covers every dot currently observed under it. A peer that has a newer
/// (concurrent) write under `key` keeps it, since that write's dot is not in
/// this delta's context.
pub fn remove<I: ReplicaId>(state: StateRef<'_, I>, key: &str) -> Result<Delta<I>, CrdtError> {
    let map = as_map(state.store)?;
    let mapkey = MapKey::Str(key.to_string());
    let mut dots = Vec::new();
    if let Some(child) = map.get(&mapkey) {
        child.dots(&mut dots);
    }
    Ok(Delta {
        store: DotStore::empty_map(CrdtKind::ORMap),
        cc: dots.into_iter().collect::<CausalContext<I>>(),
    })
}

/// Returns a view over the map's current keys and their child stores, for
/// operators or JSON views to inspect.
pub fn entries<'a, I: ReplicaId>(
    state: StateRef<'a, I>,
) -> Result<impl Iterator<Item = (&'a str, &'a DotStore<I>)>, CrdtError> {
    let map = as_map(state.store)?;
    Ok(map.iter().filter_map(|(k, v)| match k {
        MapKey::Str(s) => Some((s.as_str(), v)),
        MapKey::Slot(_) => None,
    }))
}

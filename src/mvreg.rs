//! MVReg: a multi-value register. `write` always wins over every value the
//! writer has observed; concurrent writes from different replicas are all
//! retained until a later write (or explicit `clear`) subsumes them.
use crate::causal_context::CausalContext;
use crate::dot::{Dot, ReplicaId};
use crate::dotstore::{DotStore, Payload};
use crate::error::CrdtError;

/// A read-only view of an MVReg embedded in a larger state: the register's
/// own dot-store plus the causal context of the state it lives in.
#[derive(Clone, Copy)]
pub struct StateRef<'a, I: ReplicaId> {
    pub(crate) store: &'a DotStore<I>,
    pub(crate) cc: &'a CausalContext<I>,
}

impl<'a, I: ReplicaId> StateRef<'a, I> {
    /// Wraps a store/cc pair for use by a CRDT operator.
    pub fn new(store: &'a DotStore<I>, cc: &'a CausalContext<I>) -> Self {
        Self { store, cc }
    }
}

/// A delta produced by a CRDT operator: a store fragment plus the causal
/// context it was computed under. Joining a delta into a state is the only
/// way deltas take effect (see [`crate::state::State::join`]).
#[derive(Clone, Debug, PartialEq)]
pub struct Delta<I: ReplicaId> {
    pub store: DotStore<I>,
    pub cc: CausalContext<I>,
}

fn as_fun<I: ReplicaId>(store: &DotStore<I>) -> Result<&std::collections::BTreeMap<Dot<I>, Payload>, CrdtError> {
    match store {
        DotStore::Fun(m) => Ok(m),
        other => Err(CrdtError::TypeMismatch(format!(
            "expected dotfun (mvreg), found {:?}",
            other
        ))),
    }
}

/// Writes `value`, superseding every value this replica has seen for the
/// register. The delta's context is the fresh dot plus every dot the
/// register currently holds, so a concurrent reader's unseen writes (not yet
/// observed by this replica) survive the join, while every value this
/// replica has observed is tombstoned.
pub fn write<I: ReplicaId>(state: StateRef<'_, I>, actor: I, value: Payload) -> Result<Delta<I>, CrdtError> {
    let fun = as_fun(state.store)?;
    let dot = state.cc.next(actor);
    let mut cc: CausalContext<I> = fun.keys().copied().collect();
    cc.insert_unchecked(dot);
    let store = DotStore::Fun(std::collections::BTreeMap::from([(dot, value)]));
    Ok(Delta { store, cc })
}

/// Clears the register, observing (and thus tombstoning) every value
/// currently visible, without writing a replacement.
pub fn clear<I: ReplicaId>(state: StateRef<'_, I>) -> Result<Delta<I>, CrdtError> {
    let fun = as_fun(state.store)?;
    let cc: CausalContext<I> = fun.keys().copied().collect();
    Ok(Delta {
        store: DotStore::empty_fun(),
        cc,
    })
}

/// Returns every concurrently-held value. Empty iff the register has never
/// been written, or was last `clear`ed with no concurrent write.
pub fn read<I: ReplicaId>(state: StateRef<'_, I>) -> Result<Vec<&Payload>, CrdtError> {
    Ok(as_fun(state.store)?.values().collect())
}

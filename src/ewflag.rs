//! EWFlag: an enable-wins flag, the simplest possible dot-store consumer.
//! Kept as an optional leaf CRDT alongside MVReg for boolean-only fields
//! that don't need a multi-value read.
use crate::causal_context::CausalContext;
use crate::dot::ReplicaId;
use crate::dotstore::{DotStore, Payload};
use crate::error::CrdtError;
use crate::mvreg::{Delta, StateRef};

fn as_fun<I: ReplicaId>(store: &DotStore<I>) -> Result<&std::collections::BTreeMap<crate::dot::Dot<I>, Payload>, CrdtError> {
    match store {
        DotStore::Fun(m) => Ok(m),
        other => Err(CrdtError::TypeMismatch(format!(
            "expected dotfun (ewflag), found {:?}",
            other
        ))),
    }
}

/// Sets the flag, observing every dot this replica has seen for it.
pub fn enable<I: ReplicaId>(state: StateRef<'_, I>, actor: I) -> Result<Delta<I>, CrdtError> {
    let fun = as_fun(state.store)?;
    let dot = state.cc.next(actor);
    let mut cc: CausalContext<I> = fun.keys().copied().collect();
    cc.insert_unchecked(dot);
    let store = DotStore::Fun(std::collections::BTreeMap::from([(dot, Payload::Bool(true))]));
    Ok(Delta { store, cc })
}

/// Clears the flag, observing every dot this replica has seen for it.
pub fn disable<I: ReplicaId>(state: StateRef<'_, I>) -> Result<Delta<I>, CrdtError> {
    let fun = as_fun(state.store)?;
    let cc: CausalContext<I> = fun.keys().copied().collect();
    Ok(Delta {
        store: DotStore::empty_fun(),
        cc,
    })
}

/// True iff any dot is currently live; a concurrent enable beats a
/// concurrent disable since disable can only tombstone dots it has observed.
pub fn value<I: ReplicaId>(state: StateRef<'_, I>) -> Result<bool, CrdtError> {
    Ok(!as_fun(state.store)?.is_empty())
}

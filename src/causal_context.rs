//! The causal context: a compact representation of "the dots a state has observed".
use crate::dot::{Dot, ReplicaId};
use crate::error::CrdtError;
use std::collections::{BTreeMap, BTreeSet};

/// A compact set of dots: a dot-vector (per-actor contiguous prefix) plus a
/// dot-cloud (stragglers not yet absorbed into the prefix).
///
/// The two parts are always disjoint; `contains` agrees whether a dot was
/// absorbed into the vector or is still sitting in the cloud.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CausalContext<I: ReplicaId> {
    vector: BTreeMap<I, u64>,
    cloud: BTreeSet<Dot<I>>,
}

impl<I: ReplicaId> Default for CausalContext<I> {
    fn default() -> Self {
        Self {
            vector: BTreeMap::new(),
            cloud: BTreeSet::new(),
        }
    }
}

impl<I: ReplicaId> CausalContext<I> {
    /// Returns a new, empty causal context.
    pub fn new() -> Self {
        Self::default()
    }

    /// True iff the cloud is empty, i.e. every dot is absorbed into a
    /// contiguous per-actor prefix.
    pub fn is_causal(&self) -> bool {
        self.cloud.is_empty()
    }

    /// The highest contiguous counter observed for `actor`. Actors never
    /// seen have an implied counter of 0.
    pub fn max(&self, actor: &I) -> u64 {
        self.vector.get(actor).copied().unwrap_or(0)
    }

    /// True iff `dot` is known: absorbed into the vector's prefix, or
    /// sitting in the cloud.
    pub fn contains(&self, dot: &Dot<I>) -> bool {
        if dot.counter <= self.max(&dot.actor) {
            return true;
        }
        self.cloud.contains(dot)
    }

    /// Allocates a fresh dot `(actor, max(actor) + 1)` and records it.
    ///
    /// Two calls always produce two distinct dots; idempotence only holds
    /// once the resulting dot is folded back into the context via
    /// [`CausalContext::insert`].
    pub fn next(&self, actor: I) -> Dot<I> {
        let dot = Dot::new(actor, self.max(&actor) + 1);
        tracing::trace!(?dot, "allocated fresh dot");
        dot
    }

    /// Records a dot, promoting cloud entries into the vector if this dot
    /// closed a contiguous range for its actor.
    ///
    /// Returns [`CrdtError::DotReuse`] if the dot is already known — minting
    /// the same dot twice is an internal invariant breach, never a normal
    /// outcome of replication.
    pub fn insert(&mut self, dot: Dot<I>) -> Result<(), CrdtError> {
        if self.contains(&dot) {
            tracing::error!("dot reuse: {:?} already known", dot);
            return Err(CrdtError::DotReuse(format!("{:?}", dot)));
        }
        self.insert_unchecked(dot);
        Ok(())
    }

    /// Like [`CausalContext::insert`], but does not treat an already-known
    /// dot as an error. Used internally while merging remote state, where
    /// re-observing a dot we already have is expected and idempotent.
    pub fn insert_unchecked(&mut self, dot: Dot<I>) {
        let current = self.max(&dot.actor);
        if dot.counter == current + 1 {
            self.vector.insert(dot.actor, dot.counter);
            self.compact();
        } else if dot.counter > current {
            self.cloud.insert(dot);
        }
    }

    /// Merges `other` into `self` (the CC side of `join`).
    pub fn union(&mut self, other: &Self) {
        for (actor, counter) in &other.vector {
            if *counter > self.max(actor) {
                self.vector.insert(*actor, *counter);
            }
        }
        self.compact();
        for dot in &other.cloud {
            self.insert_unchecked(*dot);
        }
    }

    /// Returns the intersection of two causal contexts.
    pub fn intersect(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for (actor, counter) in &self.vector {
            let counter = std::cmp::min(*counter, other.max(actor));
            if counter > 0 {
                out.vector.insert(*actor, counter);
            }
        }
        out.cloud = self.cloud.intersection(&other.cloud).copied().collect();
        out
    }

    /// Returns the dots in `self` that are not known to `other`.
    pub fn difference(&self, other: &Self) -> Self {
        let mut out = Self::new();
        for (actor, counter) in &self.vector {
            if *counter > other.max(actor) {
                out.vector.insert(*actor, *counter);
            }
        }
        for dot in &self.cloud {
            if !other.contains(dot) {
                out.cloud.insert(*dot);
            }
        }
        out
    }

    /// Iterates every dot contained in this context.
    pub fn iter(&self) -> impl Iterator<Item = Dot<I>> + '_ {
        self.vector
            .iter()
            .flat_map(|(actor, max)| (1..=*max).map(move |c| Dot::new(*actor, c)))
            .chain(self.cloud.iter().copied())
    }

    fn compact(&mut self) {
        loop {
            let mut progress = false;
            let vector = &mut self.vector;
            self.cloud.retain(|dot| {
                let next = vector.get(&dot.actor).copied().unwrap_or(0) + 1;
                if dot.counter == next {
                    vector.insert(dot.actor, next);
                    progress = true;
                    false
                } else {
                    true
                }
            });
            if !progress {
                break;
            }
        }
    }
}

impl<I: ReplicaId> std::iter::FromIterator<Dot<I>> for CausalContext<I> {
    fn from_iter<It: IntoIterator<Item = Dot<I>>>(iter: It) -> Self {
        let mut cc = Self::new();
        for dot in iter {
            cc.insert_unchecked(dot);
        }
        cc
    }
}

impl<I: ReplicaId> Extend<Dot<I>> for CausalContext<I> {
    fn extend<It: IntoIterator<Item = Dot<I>>>(&mut self, iter: It) {
        for dot in iter {
            self.insert_unchecked(dot);
        }
    }
}

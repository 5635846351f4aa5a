//! A version marker for a single replica.

/// A replica id is an opaque identifier for a replica.
///
/// Two [`State`](crate::state::State)s that share a process must never share a
/// replica id, or freshly minted dots collide across them.
pub trait ReplicaId: Copy + Ord + std::fmt::Debug + 'static {}

impl<T: Copy + Ord + std::fmt::Debug + 'static> ReplicaId for T {}

/// `Dot` is `(replicaId, seq)`: a unique tag for a single write event.
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Dot<I: ReplicaId> {
    /// The replica that issued this dot.
    pub actor: I,
    /// The sequence number of the write, strictly increasing per actor.
    pub counter: u64,
}

impl<I: ReplicaId> Dot<I> {
    /// Builds a dot from a replica id and a counter.
    pub fn new(actor: I, counter: u64) -> Self {
        Self { actor, counter }
    }

    /// Returns the successor of this dot for the same actor.
    pub fn succ(&self) -> Self {
        Self::new(self.actor, self.counter + 1)
    }
}

impl<I: ReplicaId + std::fmt::Debug> std::fmt::Debug for Dot<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "({:?},{})", self.actor, self.counter)
    }
}

impl<I: ReplicaId + std::fmt::Display> std::fmt::Display for Dot<I> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}.{}", self.actor, self.counter)
    }
}

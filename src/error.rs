//! Fatal error kinds raised by the engine. None are retried internally; the
//! host decides whether to surface or buffer them.
use thiserror::Error;

/// An error raised by a CRDT operator or by `join`. All are fatal within the
/// operation that raised them — the engine never partially applies a delta.
#[derive(Debug, Error)]
pub enum CrdtError {
    /// Two `DotStore`s that were joined, or a state and an incoming delta,
    /// disagree on their CRDT typename or on their structural shape (e.g. a
    /// `DotFun` joined against a `DotMap`).
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// An `ORArray` operation (`move_to`, `apply_to_value`, `delete`)
    /// targeted a uid that has never been observed under this state.
    #[error("missing element: {0}")]
    MissingElement(String),

    /// `Position::between` (or an ordering comparison) was asked to operate
    /// on a malformed position.
    #[error("invalid position: {0}")]
    InvalidPosition(String),

    /// An internal invariant breach: a dot was allocated that the causal
    /// context already knows about. Indicates a bug in the caller or the
    /// engine; never a normal outcome of replication.
    #[error("dot reuse: {0}")]
    DotReuse(String),
}

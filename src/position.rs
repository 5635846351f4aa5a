//! A dense, totally-ordered identifier used as `ORArray`'s sort key.
//!
//! A `Position` is a non-empty sequence of non-negative integers, ordered
//! lexicographically the same way a `Vec<u64>` is: element-wise, with a
//! strict prefix sorting before its extension. `between` always produces a
//! fresh value strictly between two given positions, without ever touching
//! (or needing to touch) an existing one — the density property that makes
//! array element ordering convergent without renumbering.
use crate::error::CrdtError;
use smallvec::{smallvec, SmallVec};

/// A position in an `ORArray`'s total order.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Position(SmallVec<[u64; 4]>);

impl Position {
    /// Builds a position from its digits. Errors if `digits` is empty — the
    /// engine never represents "no position" this way.
    pub fn new(digits: impl IntoIterator<Item = u64>) -> Result<Self, CrdtError> {
        let digits: SmallVec<[u64; 4]> = digits.into_iter().collect();
        if digits.is_empty() {
            return Err(CrdtError::InvalidPosition("position has no digits".into()));
        }
        Ok(Self(digits))
    }

    /// A sentinel strictly below every position this engine will ever
    /// produce via [`Position::between`]. Not itself a valid element
    /// position — only a lower bound for allocating the first one.
    pub fn min_bound() -> Self {
        Self(smallvec![0])
    }

    /// A sentinel strictly above every position this engine will ever
    /// produce via [`Position::between`].
    pub fn max_bound() -> Self {
        Self(smallvec![u64::MAX])
    }

    fn digit(&self, i: usize) -> Option<u64> {
        self.0.get(i).copied()
    }

    /// Produces a position `r` such that `p < r < q`, given `p < q`.
    ///
    /// Walks the shared prefix; at the first index where the two sequences
    /// would differ (treating an exhausted `p` as continuing with zeros),
    /// picks the midpoint digit if the gap is at least 2, otherwise commits
    /// to the smaller digit and recurses one level deeper using `p`'s own
    /// remaining digits, so the result stays a strict extension of `p`
    /// without needing anything from `q` beyond the index that already
    /// decided the comparison.
    pub fn between(p: &Self, q: &Self) -> Result<Self, CrdtError> {
        if p >= q {
            return Err(CrdtError::InvalidPosition(format!(
                "between requires p < q, got {:?} >= {:?}",
                p, q
            )));
        }
        let mut out: SmallVec<[u64; 4]> = SmallVec::new();
        let mut i = 0usize;
        loop {
            let a = p.digit(i).unwrap_or(0);
            let b = q.digit(i).ok_or_else(|| {
                CrdtError::InvalidPosition("between: rhs exhausted before lhs".into())
            })?;
            if b == a {
                out.push(a);
                i += 1;
                continue;
            }
            if b > a + 1 {
                out.push(a + (b - a) / 2);
                return Ok(Self(out));
            }
            // b == a + 1: r's prefix through i already guarantees r < q.
            out.push(a);
            if p.digit(i).is_none() {
                return Ok(Self(out));
            }
            i += 1;
            loop {
                match p.digit(i) {
                    Some(d) => {
                        out.push(d);
                        i += 1;
                    }
                    None => {
                        out.push(0);
                        return Ok(Self(out));
                    }
                }
            }
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, d) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, "]")
    }
}

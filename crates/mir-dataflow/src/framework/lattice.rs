//! The join-semilattice abstraction the engine iterates over.

use crate::framework::bitset::{BitSet, Idx};

/// A partial order with a least upper bound.
pub trait JoinSemiLattice {
    /// Computes `self = self ⊔ other`; returns whether `self` changed.
    fn join(&mut self, other: &Self) -> bool;
}

/// Set union; the may-analysis lattice.
impl<T: Idx> JoinSemiLattice for BitSet<T> {
    fn join(&mut self, other: &Self) -> bool {
        self.union(other)
    }
}

impl JoinSemiLattice for bool {
    fn join(&mut self, other: &Self) -> bool {
        if *other && !*self {
            *self = true;
            return true;
        }
        false
    }
}

/// Pointwise join of a pair of lattices.
impl<A: JoinSemiLattice, B: JoinSemiLattice> JoinSemiLattice for (A, B) {
    fn join(&mut self, other: &Self) -> bool {
        let first = self.0.join(&other.0);
        let second = self.1.join(&other.1);
        first || second
    }
}

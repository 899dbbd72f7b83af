//! A fixed-width bit set indexed by dense index types.

use std::fmt;
use std::marker::PhantomData;

use bitvec::vec::BitVec;

/// A type usable as a dense bit-set index.
pub trait Idx: Copy + Eq {
    fn new(index: usize) -> Self;
    fn index(self) -> usize;
}

impl<T> Idx for la_arena::Idx<T> {
    fn new(index: usize) -> Self {
        la_arena::Idx::from_raw(la_arena::RawIdx::from(index as u32))
    }

    fn index(self) -> usize {
        u32::from(self.into_raw()) as usize
    }
}

/// A set over the elements `0..len` of an index domain. The domain size is
/// fixed at construction; all binary operations require equal sizes.
#[derive(Clone, PartialEq, Eq)]
pub struct BitSet<T> {
    words: BitVec,
    _marker: PhantomData<fn(T)>,
}

impl<T: Idx> BitSet<T> {
    pub fn new_empty(domain_size: usize) -> BitSet<T> {
        BitSet { words: BitVec::repeat(false, domain_size), _marker: PhantomData }
    }

    pub fn new_filled(domain_size: usize) -> BitSet<T> {
        BitSet { words: BitVec::repeat(true, domain_size), _marker: PhantomData }
    }

    pub fn domain_size(&self) -> usize {
        self.words.len()
    }

    pub fn contains(&self, elem: T) -> bool {
        self.words[elem.index()]
    }

    /// Returns whether the set changed.
    pub fn insert(&mut self, elem: T) -> bool {
        let index = elem.index();
        let was_set = self.words[index];
        self.words.set(index, true);
        !was_set
    }

    /// Returns whether the set changed.
    pub fn remove(&mut self, elem: T) -> bool {
        let index = elem.index();
        let was_set = self.words[index];
        self.words.set(index, false);
        was_set
    }

    pub fn insert_all(&mut self) {
        self.words.fill(true);
    }

    pub fn clear(&mut self) {
        self.words.fill(false);
    }

    pub fn count(&self) -> usize {
        self.words.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.words.not_any()
    }

    /// Unions `other` into `self`; returns whether `self` changed.
    pub fn union(&mut self, other: &BitSet<T>) -> bool {
        debug_assert_eq!(self.domain_size(), other.domain_size());
        let mut changed = false;
        for index in other.words.iter_ones() {
            if !self.words[index] {
                self.words.set(index, true);
                changed = true;
            }
        }
        changed
    }

    pub fn is_subset_of(&self, other: &BitSet<T>) -> bool {
        debug_assert_eq!(self.domain_size(), other.domain_size());
        self.words.iter_ones().all(|index| other.words[index])
    }

    /// Set elements in ascending index order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        self.words.iter_ones().map(T::new)
    }
}

impl<T: Idx> fmt::Debug for BitSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.words.iter_ones()).finish()
    }
}

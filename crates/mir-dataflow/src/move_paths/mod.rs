//! The move-path forest: one node per place whose initialization state is
//! tracked, arranged as a trie over field projections.
//!
//! Paths through a `Deref` or `Index` projection are not tracked; a lookup
//! for such a place resolves to its closest tracked ancestor.

mod builder;

use la_arena::{Arena, Idx};
use mir::{LocalId, Location, Place};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::framework::bitset::Idx as _;

pub type MovePathIndex = Idx<MovePath>;
pub type MoveOutIndex = Idx<MoveOut>;
pub type InitIndex = Idx<Init>;

/// A node of the forest. Children of one parent form a singly linked list
/// through `next_sibling`, newest first.
#[derive(Debug)]
pub struct MovePath {
    pub next_sibling: Option<MovePathIndex>,
    pub first_child: Option<MovePathIndex>,
    pub parent: Option<MovePathIndex>,
    pub place: Place,
}

/// A move out of a path: `Operand::Move`, `Drop`, or `StorageDead`.
#[derive(Debug, Clone, Copy)]
pub struct MoveOut {
    pub path: MovePathIndex,
    pub source: Location,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitKind {
    /// The path and everything below it becomes initialized.
    Deep,
    /// Only the path itself; used for assignments whose type hides its
    /// contents from tracking.
    Shallow,
    /// A call writing its destination: takes effect only on the non-unwind
    /// return edge, so the location-indexed effect is a no-op.
    NonPanicPathOnly,
}

#[derive(Debug, Clone, Copy)]
pub struct Init {
    pub path: MovePathIndex,
    pub location: Location,
    pub kind: InitKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupResult {
    /// The place itself is tracked.
    Exact(MovePathIndex),
    /// The place is below a tracked path (or below none at all).
    Parent(Option<MovePathIndex>),
}

/// Place-to-path reverse lookup.
#[derive(Debug, Default)]
pub struct MovePathLookup {
    /// One root path per local, indexed by the local's raw index.
    locals: Vec<MovePathIndex>,
    projections: FxHashMap<(MovePathIndex, u32), MovePathIndex>,
}

impl MovePathLookup {
    pub fn find_local(&self, local: LocalId) -> MovePathIndex {
        self.locals[local.index()]
    }

    pub fn find(&self, place: &Place) -> LookupResult {
        let mut result = self.find_local(place.local);
        for elem in &place.projection {
            match elem {
                mir::PlaceElem::Field(field, _) => {
                    match self.projections.get(&(result, *field)) {
                        Some(&child) => result = child,
                        None => return LookupResult::Parent(Some(result)),
                    }
                }
                mir::PlaceElem::Deref | mir::PlaceElem::Index(_) => {
                    return LookupResult::Parent(Some(result));
                }
            }
        }
        LookupResult::Exact(result)
    }
}

#[derive(Debug)]
pub struct MoveData {
    pub move_paths: Arena<MovePath>,
    pub moves: Arena<MoveOut>,
    /// Move-outs whose effect happens at a given location.
    pub loc_map: FxHashMap<Location, SmallVec<[MoveOutIndex; 4]>>,
    pub inits: Arena<Init>,
    pub init_loc_map: FxHashMap<Location, SmallVec<[InitIndex; 4]>>,
    pub rev_lookup: MovePathLookup,
}

impl MoveData {
    pub fn base_local(&self, mut path: MovePathIndex) -> LocalId {
        loop {
            match self.move_paths[path].parent {
                Some(parent) => path = parent,
                None => return self.move_paths[path].place.local,
            }
        }
    }
}

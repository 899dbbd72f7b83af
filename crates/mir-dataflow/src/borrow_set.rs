//! All borrows of a body, each with a stable [`BorrowIndex`] that doubles
//! as the bit position in the in-scope-borrows analysis.

use std::fmt;
use std::ops::Index;

use mir::ty::Ty;
use mir::visit::Visitor;
use mir::{
    Body, BorrowKind, LocalId, Location, Mutability, Place, PlaceElem, Rvalue, Statement,
};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::framework::bitset::{BitSet, Idx};
use crate::move_paths::MoveData;
use crate::FxIndexMap;

/// Position of a borrow in [`BorrowSet::location_map`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BorrowIndex(u32);

impl Idx for BorrowIndex {
    fn new(index: usize) -> BorrowIndex {
        BorrowIndex(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TwoPhaseActivation {
    NotTwoPhase,
    NotActivated,
    ActivatedAt(Location),
}

#[derive(Debug, Clone)]
pub struct BorrowData {
    /// Where the borrow reservation starts; for non-two-phase borrows this
    /// is also where it becomes active.
    pub reserve_location: Location,
    pub activation_location: TwoPhaseActivation,
    pub kind: BorrowKind,
    pub borrowed_place: Place,
    /// The place the reference was written into.
    pub assigned_place: Place,
}

impl fmt::Display for BorrowData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.kind {
            BorrowKind::Shared => "",
            BorrowKind::Shallow => "shallow ",
            BorrowKind::Mut { .. } => "mut ",
        };
        write!(f, "&{}{}", kind, self.borrowed_place)
    }
}

/// What happens to a local's storage when the body finishes.
#[derive(Debug)]
pub enum LocalsStateAtExit {
    /// Returning invalidates every borrow of a local.
    AllAreInvalidated,
    /// Only locals whose storage is explicitly killed, or that are moved
    /// from, lose their borrows at exit.
    SomeAreInvalidated { has_storage_dead_or_moved: BitSet<LocalId> },
}

impl LocalsStateAtExit {
    fn build(
        locals_are_invalidated_at_exit: bool,
        body: &Body,
        move_data: &MoveData,
    ) -> LocalsStateAtExit {
        if locals_are_invalidated_at_exit {
            return LocalsStateAtExit::AllAreInvalidated;
        }
        struct HasStorageDead(BitSet<LocalId>);
        impl Visitor for HasStorageDead {
            fn visit_statement(&mut self, statement: &Statement, _location: Location) {
                if let Statement::StorageDead(local) = statement {
                    self.0.insert(*local);
                }
            }
        }
        let mut has_storage_dead = HasStorageDead(BitSet::new_empty(body.locals.len()));
        has_storage_dead.visit_body(body);
        let mut has_storage_dead_or_moved = has_storage_dead.0;
        for (_, move_out) in move_data.moves.iter() {
            has_storage_dead_or_moved.insert(move_data.base_local(move_out.path));
        }
        LocalsStateAtExit::SomeAreInvalidated { has_storage_dead_or_moved }
    }
}

pub struct BorrowSet {
    /// Every tracked borrow, keyed by its reserve location. Iteration order
    /// is insertion order, so positions are the borrow indices.
    pub location_map: FxIndexMap<Location, BorrowData>,
    /// Two-phase borrows activating at a given location.
    pub activation_map: FxHashMap<Location, Vec<BorrowIndex>>,
    /// Borrows keyed by the borrowed place's base local.
    pub local_map: FxHashMap<LocalId, FxHashSet<BorrowIndex>>,
    pub locals_state_at_exit: LocalsStateAtExit,
}

impl Index<BorrowIndex> for BorrowSet {
    type Output = BorrowData;

    fn index(&self, index: BorrowIndex) -> &BorrowData {
        match self.location_map.get_index(index.index()) {
            Some((_, borrow)) => borrow,
            None => panic!("borrow index out of range"),
        }
    }
}

impl BorrowSet {
    pub fn build(
        body: &Body,
        locals_are_invalidated_at_exit: bool,
        move_data: &MoveData,
    ) -> BorrowSet {
        let locals_state_at_exit =
            LocalsStateAtExit::build(locals_are_invalidated_at_exit, body, move_data);
        let mut visitor = GatherBorrows {
            body,
            location_map: FxIndexMap::default(),
            activation_map: FxHashMap::default(),
            local_map: FxHashMap::default(),
            pending_activations: FxHashMap::default(),
            locals_state_at_exit,
        };
        visitor.visit_body(body);
        debug!(body = %body.name, borrows = visitor.location_map.len(), "gathered borrows");
        BorrowSet {
            location_map: visitor.location_map,
            activation_map: visitor.activation_map,
            local_map: visitor.local_map,
            locals_state_at_exit: visitor.locals_state_at_exit,
        }
    }

    pub fn len(&self) -> usize {
        self.location_map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.location_map.is_empty()
    }

    pub fn indices(&self) -> impl Iterator<Item = BorrowIndex> {
        (0..self.len()).map(BorrowIndex::new)
    }

    pub fn iter_enumerated(&self) -> impl Iterator<Item = (BorrowIndex, &BorrowData)> {
        self.location_map.values().enumerate().map(|(i, borrow)| (BorrowIndex::new(i), borrow))
    }

    /// The borrow reserved at `location`, if it is tracked.
    pub fn get_index_of(&self, location: &Location) -> Option<BorrowIndex> {
        self.location_map.get_index_of(location).map(BorrowIndex::new)
    }

    pub fn activations_at_location(&self, location: Location) -> &[BorrowIndex] {
        self.activation_map.get(&location).map(|activations| &**activations).unwrap_or(&[])
    }
}

struct GatherBorrows<'a> {
    body: &'a Body,
    location_map: FxIndexMap<Location, BorrowData>,
    activation_map: FxHashMap<Location, Vec<BorrowIndex>>,
    local_map: FxHashMap<LocalId, FxHashSet<BorrowIndex>>,
    /// Two-phase borrows waiting for their first use of the assigned
    /// temporary, which becomes the activation point.
    pending_activations: FxHashMap<LocalId, BorrowIndex>,
    locals_state_at_exit: LocalsStateAtExit,
}

impl Visitor for GatherBorrows<'_> {
    fn visit_assign(&mut self, place: &Place, rvalue: &Rvalue, location: Location) {
        if let Rvalue::Ref(kind, borrowed_place) = rvalue {
            if !ignore_borrow(borrowed_place, self.body, &self.locals_state_at_exit) {
                let activation_location = if kind.allows_two_phase_borrow() {
                    TwoPhaseActivation::NotActivated
                } else {
                    TwoPhaseActivation::NotTwoPhase
                };
                let borrow = BorrowData {
                    reserve_location: location,
                    activation_location,
                    kind: *kind,
                    borrowed_place: borrowed_place.clone(),
                    assigned_place: place.clone(),
                };
                let (position, _) = self.location_map.insert_full(location, borrow);
                let index = BorrowIndex::new(position);
                self.local_map.entry(borrowed_place.local).or_default().insert(index);
                if kind.allows_two_phase_borrow() && place.projection.is_empty() {
                    self.pending_activations.insert(place.local, index);
                }
            }
        }
        self.super_assign(place, rvalue, location);
    }

    fn visit_place(&mut self, place: &Place, location: Location) {
        // The first use of a two-phase borrow's temporary activates it.
        if let Some(&index) = self.pending_activations.get(&place.local) {
            let borrow = match self.location_map.get_index_mut(index.index()) {
                Some((_, borrow)) => borrow,
                None => return,
            };
            if borrow.reserve_location != location
                && borrow.activation_location == TwoPhaseActivation::NotActivated
            {
                borrow.activation_location = TwoPhaseActivation::ActivatedAt(location);
                self.activation_map.entry(location).or_default().push(index);
            }
        }
    }
}

/// Borrows that can never be invalidated are left out of the set entirely:
/// borrows of immutable projection-free locals that are never storage-dead
/// or moved, and reborrows through a raw pointer or a shared reference
/// (except references to thread-local statics, which do expire).
pub(crate) fn ignore_borrow(
    place: &Place,
    body: &Body,
    locals_state_at_exit: &LocalsStateAtExit,
) -> bool {
    if let LocalsStateAtExit::SomeAreInvalidated { has_storage_dead_or_moved } =
        locals_state_at_exit
    {
        if place.projection.is_empty()
            && body.locals[place.local].mutability == Mutability::Not
            && !has_storage_dead_or_moved.contains(place.local)
        {
            return true;
        }
    }
    for (i, elem) in place.projection.iter().enumerate() {
        if let PlaceElem::Deref = elem {
            let base_ty = place.ty_before(body, i);
            match base_ty {
                Ty::Ref(_, Mutability::Not) if i == 0 => {
                    if body.locals[place.local].is_ref_to_thread_local() {
                        continue;
                    }
                    return true;
                }
                Ty::RawPtr(..) | Ty::Ref(_, Mutability::Not) => return true,
                _ => {}
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use mir::ty::IntTy;
    use mir::{BodyBuilder, Constant, Operand, Terminator};

    use super::*;
    use crate::CancellationToken;

    fn int() -> Ty {
        Ty::Int(IntTy::I32)
    }

    fn shared() -> BorrowKind {
        BorrowKind::Shared
    }

    /// let x = 1; let r = &x; with storage statements.
    fn borrow_body(storage_dead_x: bool) -> (Body, LocalId, LocalId) {
        let mut b = BodyBuilder::new("f", 0);
        let ret = b.local(Ty::Unit, Mutability::Mut);
        let x = b.local(int(), Mutability::Not);
        let r = b.local(Ty::reference(int(), Mutability::Not), Mutability::Not);
        let bb0 = b.new_block();
        b.push(bb0, Statement::StorageLive(x));
        b.push_assign(
            bb0,
            Place::from(x),
            Rvalue::Use(Operand::Constant(Constant::scalar(int(), 1))),
        );
        b.push(bb0, Statement::StorageLive(r));
        b.push_assign(bb0, Place::from(r), Rvalue::Ref(shared(), Place::from(x)));
        b.push_assign(bb0, Place::from(ret), Rvalue::Use(Operand::Constant(Constant::unit())));
        b.push(bb0, Statement::StorageDead(r));
        if storage_dead_x {
            b.push(bb0, Statement::StorageDead(x));
        }
        b.terminate(bb0, Terminator::Return);
        (b.finish(), x, r)
    }

    fn build(body: &Body, invalidated_at_exit: bool) -> BorrowSet {
        let move_data = MoveData::gather_moves(body, &CancellationToken::new()).unwrap();
        BorrowSet::build(body, invalidated_at_exit, &move_data)
    }

    #[test]
    fn records_borrow_with_location_and_local() {
        let (body, x, r) = borrow_body(true);
        let borrow_set = build(&body, true);
        assert_eq!(borrow_set.len(), 1);
        let index = borrow_set.indices().next().unwrap();
        let borrow = &borrow_set[index];
        assert_eq!(borrow.borrowed_place, Place::from(x));
        assert_eq!(borrow.assigned_place, Place::from(r));
        assert_eq!(borrow.activation_location, TwoPhaseActivation::NotTwoPhase);
        assert_eq!(borrow_set.get_index_of(&borrow.reserve_location), Some(index));
        assert!(borrow_set.local_map[&x].contains(&index));
    }

    #[test]
    fn never_invalidated_local_is_ignored() {
        // Without exit invalidation and without StorageDead(x) or a move of
        // x, a borrow of the immutable local can never expire.
        let (body, ..) = borrow_body(false);
        let borrow_set = build(&body, false);
        assert_eq!(borrow_set.len(), 0);
    }

    #[test]
    fn storage_dead_keeps_borrow_tracked() {
        let (body, ..) = borrow_body(true);
        let borrow_set = build(&body, false);
        assert_eq!(borrow_set.len(), 1);
    }

    #[test]
    fn reborrow_through_shared_ref_is_ignored() {
        let mut b = BodyBuilder::new("f", 1);
        let ret = b.local(Ty::Unit, Mutability::Mut);
        let arg = b.local(Ty::reference(int(), Mutability::Not), Mutability::Not);
        let r = b.local(Ty::reference(int(), Mutability::Not), Mutability::Not);
        let bb0 = b.new_block();
        b.push(bb0, Statement::StorageLive(r));
        b.push_assign(bb0, Place::from(r), Rvalue::Ref(shared(), Place::from(arg).deref()));
        b.push_assign(bb0, Place::from(ret), Rvalue::Use(Operand::Constant(Constant::unit())));
        b.push(bb0, Statement::StorageDead(r));
        b.terminate(bb0, Terminator::Return);
        let body = b.finish();
        let borrow_set = build(&body, true);
        assert_eq!(borrow_set.len(), 0);
    }

    #[test]
    fn reborrow_of_thread_local_ref_is_tracked() {
        let mut b = BodyBuilder::new("f", 0);
        let ret = b.local(Ty::Unit, Mutability::Mut);
        let tls = b.static_ref_local(Ty::reference(int(), Mutability::Not), true);
        let r = b.local(Ty::reference(int(), Mutability::Not), Mutability::Not);
        let bb0 = b.new_block();
        b.push_assign(bb0, Place::from(r), Rvalue::Ref(shared(), Place::from(tls).deref()));
        b.push_assign(bb0, Place::from(ret), Rvalue::Use(Operand::Constant(Constant::unit())));
        b.terminate(bb0, Terminator::Return);
        let body = b.finish();
        let borrow_set = build(&body, true);
        assert_eq!(borrow_set.len(), 1);
    }

    #[test]
    fn two_phase_borrow_activates_at_first_use() {
        let mut b = BodyBuilder::new("f", 0);
        let ret = b.local(Ty::Unit, Mutability::Mut);
        let x = b.local(int(), Mutability::Mut);
        let tmp = b.local(Ty::reference(int(), Mutability::Mut), Mutability::Not);
        let r = b.local(Ty::reference(int(), Mutability::Mut), Mutability::Not);
        let bb0 = b.new_block();
        b.push_assign(
            bb0,
            Place::from(x),
            Rvalue::Use(Operand::Constant(Constant::scalar(int(), 1))),
        );
        b.push_assign(
            bb0,
            Place::from(tmp),
            Rvalue::Ref(BorrowKind::Mut { allow_two_phase_borrow: true }, Place::from(x)),
        );
        b.push_assign(bb0, Place::from(r), Rvalue::Use(Operand::Move(Place::from(tmp))));
        b.push_assign(bb0, Place::from(ret), Rvalue::Use(Operand::Constant(Constant::unit())));
        b.terminate(bb0, Terminator::Return);
        let body = b.finish();
        let borrow_set = build(&body, true);
        assert_eq!(borrow_set.len(), 1);
        let index = borrow_set.indices().next().unwrap();
        let use_location = Location { block: body.start_block(), statement_index: 2 };
        assert_eq!(
            borrow_set[index].activation_location,
            TwoPhaseActivation::ActivatedAt(use_location)
        );
        assert_eq!(borrow_set.activations_at_location(use_location), &[index]);
    }
}

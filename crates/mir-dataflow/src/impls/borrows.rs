//! In-scope borrows: bit `b` is set while borrow `b` may still be live.

use mir::{BasicBlockId, Body, Location, Place, Rvalue, Statement, Terminator};
use rustc_hash::FxHashMap;

use crate::borrow_set::{ignore_borrow, BorrowIndex, BorrowSet};
use crate::framework::{AnalysisDomain, BitSet, Forward, GenKill, GenKillAnalysis};
use crate::places_conflict::{places_conflict, PlaceConflictBias};

/// Forward may-analysis over [`BorrowIndex`] bits.
///
/// A borrow enters scope at its reserve location and leaves it when the
/// borrowed memory is definitely overwritten, when the borrowed local's
/// storage dies, or at any location the precomputed out-of-scope map names
/// (the lifetime-inference consumer supplies that map; an empty map means
/// borrows last to the end of the body).
pub struct Borrows<'a> {
    body: &'a Body,
    borrow_set: &'a BorrowSet,
    borrows_out_of_scope_at_location: FxHashMap<Location, Vec<BorrowIndex>>,
}

impl<'a> Borrows<'a> {
    pub fn new(
        body: &'a Body,
        borrow_set: &'a BorrowSet,
        borrows_out_of_scope_at_location: FxHashMap<Location, Vec<BorrowIndex>>,
    ) -> Borrows<'a> {
        Borrows { body, borrow_set, borrows_out_of_scope_at_location }
    }

    fn kill_loans_out_of_scope_at_location(
        &self,
        trans: &mut impl GenKill<BorrowIndex>,
        location: Location,
    ) {
        if let Some(indices) = self.borrows_out_of_scope_at_location.get(&location) {
            trans.kill_all(indices.iter().copied());
        }
    }

    /// Kills borrows whose memory is definitely overwritten by a write to
    /// `place`. The `NoOverlap` bias keeps possibly-disjoint index writes
    /// from killing a borrow that may still be observed.
    fn kill_borrows_on_place(&self, trans: &mut impl GenKill<BorrowIndex>, place: &Place) {
        let Some(other_borrows_of_local) = self.borrow_set.local_map.get(&place.local) else {
            return;
        };
        if place.projection.is_empty() {
            // A write to the whole local kills everything rooted at it,
            // unless the local holds a reference to a static: such a local
            // stands in for memory that outlives the overwrite.
            if !self.body.locals[place.local].is_ref_to_static() {
                trans.kill_all(other_borrows_of_local.iter().copied());
            }
            return;
        }
        for &index in other_borrows_of_local {
            let borrowed_place = &self.borrow_set[index].borrowed_place;
            if places_conflict(self.body, borrowed_place, place, PlaceConflictBias::NoOverlap)
            {
                trans.kill(index);
            }
        }
    }
}

impl AnalysisDomain for Borrows<'_> {
    type Domain = BitSet<BorrowIndex>;
    type Direction = Forward;

    const NAME: &'static str = "borrows";

    fn bottom_value(&self, _body: &Body) -> Self::Domain {
        // bottom = no borrow in scope
        BitSet::new_empty(self.borrow_set.len())
    }

    fn initialize_start_block(&self, _body: &Body, _state: &mut Self::Domain) {}
}

impl GenKillAnalysis for Borrows<'_> {
    type Idx = BorrowIndex;

    fn before_statement_effect(
        &mut self,
        trans: &mut impl GenKill<BorrowIndex>,
        _statement: &Statement,
        location: Location,
    ) {
        self.kill_loans_out_of_scope_at_location(trans, location);
    }

    fn statement_effect(
        &mut self,
        trans: &mut impl GenKill<BorrowIndex>,
        statement: &Statement,
        location: Location,
    ) {
        match statement {
            Statement::Assign(place, rvalue) => {
                if let Rvalue::Ref(_, borrowed_place) = rvalue {
                    if !ignore_borrow(
                        borrowed_place,
                        self.body,
                        &self.borrow_set.locals_state_at_exit,
                    ) {
                        let index = match self.borrow_set.get_index_of(&location) {
                            Some(index) => index,
                            None => panic!("no borrow recorded at {location:?}"),
                        };
                        trans.gen(index);
                    }
                }
                // A move out of the right-hand side does not end a loan;
                // only overwriting the borrowed memory does.
                self.kill_borrows_on_place(trans, place);
            }
            Statement::StorageDead(local) => {
                self.kill_borrows_on_place(trans, &Place::from(*local));
            }
            Statement::StorageLive(_) | Statement::FakeRead(..) | Statement::Nop => {}
        }
    }

    fn before_terminator_effect(
        &mut self,
        trans: &mut impl GenKill<BorrowIndex>,
        _terminator: &Terminator,
        location: Location,
    ) {
        self.kill_loans_out_of_scope_at_location(trans, location);
    }

    fn terminator_effect(
        &mut self,
        _trans: &mut impl GenKill<BorrowIndex>,
        _terminator: &Terminator,
        _location: Location,
    ) {
    }

    fn call_return_effect(
        &mut self,
        _trans: &mut impl GenKill<BorrowIndex>,
        _block: BasicBlockId,
        _return_place: &Place,
    ) {
    }
}

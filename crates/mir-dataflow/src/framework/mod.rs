//! The dataflow framework proper: analysis traits, the fixpoint engine, and
//! ways to inspect results (cursor, visitor, textual dump).
//!
//! An analysis describes its lattice through [`AnalysisDomain`] and its
//! transfer function through either [`Analysis`] (arbitrary effects) or
//! [`GenKillAnalysis`] (effects expressible as gen/kill bit twiddling; such
//! analyses get their [`Analysis`] impl for free). "Before" effects are
//! applied strictly ahead of the primary effect of the same location, so an
//! analysis can order kills ahead of gens within one statement.

pub mod bitset;
mod cursor;
mod direction;
mod engine;
pub mod fmt;
mod lattice;
mod visitor;


use mir::{BasicBlockId, Body, Location, Place, Statement, Terminator};

pub use self::bitset::{BitSet, Idx};
pub use self::cursor::ResultsCursor;
pub use self::direction::{Backward, Direction, Forward};
pub use self::engine::{Engine, Results};
pub use self::lattice::JoinSemiLattice;
pub use self::visitor::{visit_results, ResultsVisitor};

/// The lattice and direction of an analysis.
pub trait AnalysisDomain {
    type Domain: Clone + JoinSemiLattice;
    type Direction: Direction;

    /// Used in debug output.
    const NAME: &'static str;

    /// The bottom element: the state every block starts from.
    fn bottom_value(&self, body: &Body) -> Self::Domain;

    /// Mutates the start-block state before fixpoint iteration. Not called
    /// for backward analyses; their blocks all start from bottom.
    fn initialize_start_block(&self, body: &Body, state: &mut Self::Domain);
}

/// A dataflow analysis with arbitrary transfer functions.
pub trait Analysis: AnalysisDomain {
    fn apply_statement_effect(
        &mut self,
        state: &mut Self::Domain,
        statement: &Statement,
        location: Location,
    );

    fn apply_before_statement_effect(
        &mut self,
        _state: &mut Self::Domain,
        _statement: &Statement,
        _location: Location,
    ) {
    }

    fn apply_terminator_effect(
        &mut self,
        state: &mut Self::Domain,
        terminator: &Terminator,
        location: Location,
    );

    fn apply_before_terminator_effect(
        &mut self,
        _state: &mut Self::Domain,
        _terminator: &Terminator,
        _location: Location,
    ) {
    }

    /// Edge effect for the successful return edge of a `Call` terminator.
    /// Applied to the state flowing into the return target only; the unwind
    /// edge sees the plain exit state.
    fn apply_call_return_effect(
        &mut self,
        _state: &mut Self::Domain,
        _block: BasicBlockId,
        _return_place: &Place,
    ) {
    }
}

/// A transfer-function sink for gen/kill analyses. Implemented by
/// [`BitSet`] (applies immediately) so gen-kill effects can run directly on
/// the state.
pub trait GenKill<T> {
    fn gen(&mut self, elem: T);
    fn kill(&mut self, elem: T);

    fn gen_all(&mut self, elems: impl IntoIterator<Item = T>)
    where
        Self: Sized,
    {
        for elem in elems {
            self.gen(elem);
        }
    }

    fn kill_all(&mut self, elems: impl IntoIterator<Item = T>)
    where
        Self: Sized,
    {
        for elem in elems {
            self.kill(elem);
        }
    }
}

impl<T: Idx> GenKill<T> for BitSet<T> {
    fn gen(&mut self, elem: T) {
        self.insert(elem);
    }

    fn kill(&mut self, elem: T) {
        self.remove(elem);
    }
}

/// An analysis whose effects only set and clear bits.
pub trait GenKillAnalysis: Analysis {
    type Idx: Idx;

    fn statement_effect(
        &mut self,
        trans: &mut impl GenKill<Self::Idx>,
        statement: &Statement,
        location: Location,
    );

    fn before_statement_effect(
        &mut self,
        _trans: &mut impl GenKill<Self::Idx>,
        _statement: &Statement,
        _location: Location,
    ) {
    }

    fn terminator_effect(
        &mut self,
        trans: &mut impl GenKill<Self::Idx>,
        terminator: &Terminator,
        location: Location,
    );

    fn before_terminator_effect(
        &mut self,
        _trans: &mut impl GenKill<Self::Idx>,
        _terminator: &Terminator,
        _location: Location,
    ) {
    }

    fn call_return_effect(
        &mut self,
        _trans: &mut impl GenKill<Self::Idx>,
        _block: BasicBlockId,
        _return_place: &Place,
    ) {
    }
}

impl<A> Analysis for A
where
    A: GenKillAnalysis,
    A::Domain: GenKill<A::Idx>,
{
    fn apply_statement_effect(
        &mut self,
        state: &mut Self::Domain,
        statement: &Statement,
        location: Location,
    ) {
        self.statement_effect(state, statement, location);
    }

    fn apply_before_statement_effect(
        &mut self,
        state: &mut Self::Domain,
        statement: &Statement,
        location: Location,
    ) {
        self.before_statement_effect(state, statement, location);
    }

    fn apply_terminator_effect(
        &mut self,
        state: &mut Self::Domain,
        terminator: &Terminator,
        location: Location,
    ) {
        self.terminator_effect(state, terminator, location);
    }

    fn apply_before_terminator_effect(
        &mut self,
        state: &mut Self::Domain,
        terminator: &Terminator,
        location: Location,
    ) {
        self.before_terminator_effect(state, terminator, location);
    }

    fn apply_call_return_effect(
        &mut self,
        state: &mut Self::Domain,
        block: BasicBlockId,
        return_place: &Place,
    ) {
        self.call_return_effect(state, block, return_place);
    }
}

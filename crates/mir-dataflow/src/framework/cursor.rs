//! Random access into solved dataflow results.

use mir::{BasicBlockId, Body, Location};

use crate::framework::bitset::{BitSet, Idx};
use crate::framework::engine::Results;
use crate::framework::{Analysis, AnalysisDomain, Forward};

/// Replays block effects on demand to answer "what is the state just
/// before/after this location". Each seek replays from the block entry, so
/// this favors scattered queries over dense scans.
pub struct ResultsCursor<'res, A: Analysis> {
    body: &'res Body,
    results: &'res mut Results<A>,
    state: A::Domain,
}

impl<'res, A> ResultsCursor<'res, A>
where
    A: Analysis + AnalysisDomain<Direction = Forward>,
{
    pub fn new(body: &'res Body, results: &'res mut Results<A>) -> ResultsCursor<'res, A> {
        let state = results.analysis.bottom_value(body);
        ResultsCursor { body, results, state }
    }

    pub fn analysis(&self) -> &A {
        &self.results.analysis
    }

    /// The state at the last seek target.
    pub fn get(&self) -> &A::Domain {
        &self.state
    }

    pub fn seek_to_block_entry(&mut self, block: BasicBlockId) {
        self.state.clone_from(self.results.entry_set_for_block(block));
    }

    /// State after the "before" effect of `location` but before its primary
    /// effect. This is the state the borrow checker consults for an access
    /// at `location`.
    pub fn seek_before_primary_effect(&mut self, location: Location) {
        self.seek(location, false);
    }

    /// State after the primary effect of `location`.
    pub fn seek_after_primary_effect(&mut self, location: Location) {
        self.seek(location, true);
    }

    fn seek(&mut self, location: Location, after_primary: bool) {
        self.seek_to_block_entry(location.block);
        let body = self.body;
        let block_data = &body.basic_blocks[location.block];
        let analysis = &mut self.results.analysis;

        for statement_index in 0..location.statement_index {
            let loc = Location { block: location.block, statement_index };
            let statement = &block_data.statements[statement_index];
            analysis.apply_before_statement_effect(&mut self.state, statement, loc);
            analysis.apply_statement_effect(&mut self.state, statement, loc);
        }

        if location.statement_index < block_data.statements.len() {
            let statement = &block_data.statements[location.statement_index];
            analysis.apply_before_statement_effect(&mut self.state, statement, location);
            if after_primary {
                analysis.apply_statement_effect(&mut self.state, statement, location);
            }
        } else {
            let terminator = block_data.terminator();
            analysis.apply_before_terminator_effect(&mut self.state, terminator, location);
            if after_primary {
                analysis.apply_terminator_effect(&mut self.state, terminator, location);
            }
        }
    }
}

impl<'res, A, I> ResultsCursor<'res, A>
where
    A: Analysis + AnalysisDomain<Direction = Forward, Domain = BitSet<I>>,
    I: Idx,
{
    pub fn contains(&self, elem: I) -> bool {
        self.state.contains(elem)
    }
}

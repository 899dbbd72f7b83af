//! Linear consumption of solved results, block by block.

use mir::{BasicBlock, BasicBlockId, Body, Location, Statement, Terminator};

use crate::framework::direction::Direction;
use crate::framework::engine::Results;
use crate::framework::Analysis;

/// Observes the dataflow state around every effect of the visited blocks.
/// The "before" hooks run after the location's before-effect, so the state
/// they see already reflects scope kills and the like.
pub trait ResultsVisitor<D> {
    fn visit_block_start(&mut self, _state: &D, _block_data: &BasicBlock, _block: BasicBlockId) {}

    fn visit_statement_before_primary_effect(
        &mut self,
        _state: &D,
        _statement: &Statement,
        _location: Location,
    ) {
    }

    fn visit_statement_after_primary_effect(
        &mut self,
        _state: &D,
        _statement: &Statement,
        _location: Location,
    ) {
    }

    fn visit_terminator_before_primary_effect(
        &mut self,
        _state: &D,
        _terminator: &Terminator,
        _location: Location,
    ) {
    }

    fn visit_terminator_after_primary_effect(
        &mut self,
        _state: &D,
        _terminator: &Terminator,
        _location: Location,
    ) {
    }

    fn visit_block_end(&mut self, _state: &D, _block_data: &BasicBlock, _block: BasicBlockId) {}
}

pub fn visit_results<A: Analysis>(
    body: &Body,
    blocks: impl IntoIterator<Item = BasicBlockId>,
    results: &mut Results<A>,
    vis: &mut impl ResultsVisitor<A::Domain>,
) {
    for block in blocks {
        let entry = results.entry_set_for_block(block).clone();
        A::Direction::visit_results_in_block(
            &mut results.analysis,
            &entry,
            block,
            &body.basic_blocks[block],
            vis,
        );
    }
}

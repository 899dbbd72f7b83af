//! Worklist-based fixpoint iteration.

use std::collections::VecDeque;

use mir::{BasicBlockId, Body};
use tracing::debug;

use crate::framework::bitset::Idx;
use crate::framework::direction::Direction;
use crate::framework::visitor::{visit_results, ResultsVisitor};
use crate::framework::{Analysis, JoinSemiLattice, ResultsCursor};
use crate::{Cancelled, CancellationToken};

/// A solved dataflow problem: one entry set per block, in the direction's
/// sense (for backward analyses the "entry" is the block's exit in
/// execution order).
pub struct Results<A: Analysis> {
    pub analysis: A,
    entry_sets: Vec<A::Domain>,
}

impl<A: Analysis> Results<A> {
    pub fn entry_set_for_block(&self, block: BasicBlockId) -> &A::Domain {
        &self.entry_sets[block.index()]
    }

    pub fn as_results_cursor<'a>(&'a mut self, body: &'a Body) -> ResultsCursor<'a, A>
    where
        A: crate::AnalysisDomain<Direction = crate::Forward>,
    {
        ResultsCursor::new(body, self)
    }

    pub fn visit_reachable_with(
        &mut self,
        body: &Body,
        vis: &mut impl ResultsVisitor<A::Domain>,
    ) {
        visit_results(body, mir::traversal::reverse_postorder(body), self, vis);
    }
}

pub struct Engine<'a, A: Analysis> {
    body: &'a Body,
    analysis: A,
    entry_sets: Vec<A::Domain>,
}

impl<'a, A: Analysis> Engine<'a, A> {
    pub fn new(body: &'a Body, analysis: A) -> Engine<'a, A> {
        let bottom = analysis.bottom_value(body);
        let mut entry_sets = vec![bottom; body.basic_blocks.len()];
        if A::Direction::IS_FORWARD {
            let start = body.start_block();
            analysis.initialize_start_block(body, &mut entry_sets[start.index()]);
        }
        Engine { body, analysis, entry_sets }
    }

    /// Runs the worklist to a fixpoint. The token is polled once per block
    /// taken off the queue, so a cancelled run stops within one block's
    /// worth of work.
    pub fn iterate_to_fixpoint(
        self,
        token: &CancellationToken,
    ) -> Result<Results<A>, Cancelled> {
        let Engine { body, mut analysis, mut entry_sets } = self;

        let order = A::Direction::traversal_order(body);
        let mut queue: VecDeque<BasicBlockId> = VecDeque::with_capacity(order.len());
        let mut on_queue = vec![false; body.basic_blocks.len()];
        for &block in &order {
            queue.push_back(block);
            on_queue[block.index()] = true;
        }

        let mut state = analysis.bottom_value(body);
        let mut processed = 0usize;
        while let Some(block) = queue.pop_front() {
            token.check()?;
            on_queue[block.index()] = false;
            processed += 1;

            state.clone_from(&entry_sets[block.index()]);
            let block_data = &body.basic_blocks[block];
            A::Direction::apply_effects_in_block(&mut analysis, &mut state, block, block_data);
            A::Direction::join_state_into_successors_of(
                &mut analysis,
                body,
                &state,
                block,
                &mut |target, exit_state| {
                    if entry_sets[target.index()].join(exit_state) && !on_queue[target.index()] {
                        queue.push_back(target);
                        on_queue[target.index()] = true;
                    }
                },
            );
        }

        debug!(analysis = A::NAME, body = %body.name, processed, "fixpoint reached");
        Ok(Results { analysis, entry_sets })
    }
}

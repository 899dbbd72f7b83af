//! Forward and backward instantiations of the engine's block-level plumbing.

use mir::{traversal, BasicBlock, BasicBlockId, Body, Location, Terminator};

use crate::framework::bitset::Idx;
use crate::framework::visitor::ResultsVisitor;
use crate::framework::Analysis;

pub trait Direction {
    const IS_FORWARD: bool;

    /// The order blocks are first queued in; a good order makes the
    /// fixpoint converge in few passes. Unreachable blocks are excluded.
    fn traversal_order(body: &Body) -> Vec<BasicBlockId>;

    /// Applies all of a block's effects to `state`, which on entry holds
    /// the block's entry set (in this direction's sense).
    fn apply_effects_in_block<A: Analysis>(
        analysis: &mut A,
        state: &mut A::Domain,
        block: BasicBlockId,
        block_data: &BasicBlock,
    );

    /// Calls `propagate` once per dataflow-successor of `block` with the
    /// state that flows along that edge.
    fn join_state_into_successors_of<A: Analysis>(
        analysis: &mut A,
        body: &Body,
        exit_state: &A::Domain,
        block: BasicBlockId,
        propagate: &mut dyn FnMut(BasicBlockId, &A::Domain),
    );

    /// Replays a block's effects, reporting the state around each one to
    /// `vis`. Visitation follows analysis order, so a backward analysis
    /// sees the terminator first.
    fn visit_results_in_block<A: Analysis>(
        analysis: &mut A,
        entry: &A::Domain,
        block: BasicBlockId,
        block_data: &BasicBlock,
        vis: &mut dyn ResultsVisitor<A::Domain>,
    );
}

pub struct Forward;

impl Direction for Forward {
    const IS_FORWARD: bool = true;

    fn traversal_order(body: &Body) -> Vec<BasicBlockId> {
        traversal::reverse_postorder(body)
    }

    fn apply_effects_in_block<A: Analysis>(
        analysis: &mut A,
        state: &mut A::Domain,
        block: BasicBlockId,
        block_data: &BasicBlock,
    ) {
        for (statement_index, statement) in block_data.statements.iter().enumerate() {
            let location = Location { block, statement_index };
            analysis.apply_before_statement_effect(state, statement, location);
            analysis.apply_statement_effect(state, statement, location);
        }
        let location = Location { block, statement_index: block_data.statements.len() };
        let terminator = block_data.terminator();
        analysis.apply_before_terminator_effect(state, terminator, location);
        analysis.apply_terminator_effect(state, terminator, location);
    }

    fn join_state_into_successors_of<A: Analysis>(
        analysis: &mut A,
        body: &Body,
        exit_state: &A::Domain,
        block: BasicBlockId,
        propagate: &mut dyn FnMut(BasicBlockId, &A::Domain),
    ) {
        match body.basic_blocks[block].terminator() {
            Terminator::Call { destination, target, unwind, .. } => {
                if let Some(unwind) = unwind {
                    propagate(*unwind, exit_state);
                }
                if let Some(target) = target {
                    // The return place is written only on the non-unwind
                    // edge, so its effect is an edge effect.
                    let mut state = exit_state.clone();
                    analysis.apply_call_return_effect(&mut state, block, destination);
                    propagate(*target, &state);
                }
            }
            terminator => {
                for successor in terminator.successors() {
                    propagate(successor, exit_state);
                }
            }
        }
    }

    fn visit_results_in_block<A: Analysis>(
        analysis: &mut A,
        entry: &A::Domain,
        block: BasicBlockId,
        block_data: &BasicBlock,
        vis: &mut dyn ResultsVisitor<A::Domain>,
    ) {
        let mut state = entry.clone();
        vis.visit_block_start(&state, block_data, block);
        for (statement_index, statement) in block_data.statements.iter().enumerate() {
            let location = Location { block, statement_index };
            analysis.apply_before_statement_effect(&mut state, statement, location);
            vis.visit_statement_before_primary_effect(&state, statement, location);
            analysis.apply_statement_effect(&mut state, statement, location);
            vis.visit_statement_after_primary_effect(&state, statement, location);
        }
        let location = Location { block, statement_index: block_data.statements.len() };
        let terminator = block_data.terminator();
        analysis.apply_before_terminator_effect(&mut state, terminator, location);
        vis.visit_terminator_before_primary_effect(&state, terminator, location);
        analysis.apply_terminator_effect(&mut state, terminator, location);
        vis.visit_terminator_after_primary_effect(&state, terminator, location);
        vis.visit_block_end(&state, block_data, block);
    }
}

pub struct Backward;

impl Direction for Backward {
    const IS_FORWARD: bool = false;

    fn traversal_order(body: &Body) -> Vec<BasicBlockId> {
        traversal::postorder(body)
    }

    fn apply_effects_in_block<A: Analysis>(
        analysis: &mut A,
        state: &mut A::Domain,
        block: BasicBlockId,
        block_data: &BasicBlock,
    ) {
        let location = Location { block, statement_index: block_data.statements.len() };
        let terminator = block_data.terminator();
        analysis.apply_before_terminator_effect(state, terminator, location);
        analysis.apply_terminator_effect(state, terminator, location);
        for (statement_index, statement) in block_data.statements.iter().enumerate().rev() {
            let location = Location { block, statement_index };
            analysis.apply_before_statement_effect(state, statement, location);
            analysis.apply_statement_effect(state, statement, location);
        }
    }

    fn join_state_into_successors_of<A: Analysis>(
        analysis: &mut A,
        body: &Body,
        exit_state: &A::Domain,
        block: BasicBlockId,
        propagate: &mut dyn FnMut(BasicBlockId, &A::Domain),
    ) {
        for &pred in &body.predecessors()[block.index()] {
            match body.basic_blocks[pred].terminator() {
                // The state flowing backward out of a call's return target
                // passed through the return-edge effect on the way.
                Terminator::Call { destination, target: Some(target), .. }
                    if *target == block =>
                {
                    let mut state = exit_state.clone();
                    analysis.apply_call_return_effect(&mut state, pred, destination);
                    propagate(pred, &state);
                }
                _ => propagate(pred, exit_state),
            }
        }
    }

    fn visit_results_in_block<A: Analysis>(
        analysis: &mut A,
        entry: &A::Domain,
        block: BasicBlockId,
        block_data: &BasicBlock,
        vis: &mut dyn ResultsVisitor<A::Domain>,
    ) {
        let mut state = entry.clone();
        vis.visit_block_start(&state, block_data, block);
        let location = Location { block, statement_index: block_data.statements.len() };
        let terminator = block_data.terminator();
        analysis.apply_before_terminator_effect(&mut state, terminator, location);
        vis.visit_terminator_before_primary_effect(&state, terminator, location);
        analysis.apply_terminator_effect(&mut state, terminator, location);
        vis.visit_terminator_after_primary_effect(&state, terminator, location);
        for (statement_index, statement) in block_data.statements.iter().enumerate().rev() {
            let location = Location { block, statement_index };
            analysis.apply_before_statement_effect(&mut state, statement, location);
            vis.visit_statement_before_primary_effect(&state, statement, location);
            analysis.apply_statement_effect(&mut state, statement, location);
            vis.visit_statement_after_primary_effect(&state, statement, location);
        }
        vis.visit_block_end(&state, block_data, block);
    }
}

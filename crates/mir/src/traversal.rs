//! Block orderings over the CFG. Only blocks reachable from the start block
//! appear in any of these orders.

use crate::{block_index, BasicBlockId, Body};

/// Depth-first preorder starting at the start block.
pub fn preorder(body: &Body) -> Vec<BasicBlockId> {
    let mut visited = vec![false; body.basic_blocks.len()];
    let mut order = Vec::with_capacity(body.basic_blocks.len());
    let mut worklist = vec![body.start_block()];
    while let Some(block) = worklist.pop() {
        let seen = &mut visited[block_index(block) as usize];
        if *seen {
            continue;
        }
        *seen = true;
        order.push(block);
        let successors = body.basic_blocks[block].terminator().successors();
        worklist.extend(successors.iter().rev().copied());
    }
    order
}

/// Depth-first postorder: every block appears after all of its descendants
/// in the depth-first spanning tree.
pub fn postorder(body: &Body) -> Vec<BasicBlockId> {
    let start = body.start_block();
    let mut visited = vec![false; body.basic_blocks.len()];
    let mut order = Vec::with_capacity(body.basic_blocks.len());
    let mut stack: Vec<(BasicBlockId, usize)> = vec![(start, 0)];
    visited[block_index(start) as usize] = true;
    while let Some(&mut (block, ref mut next_succ)) = stack.last_mut() {
        let successors = body.basic_blocks[block].terminator().successors();
        match successors.get(*next_succ) {
            Some(&succ) => {
                *next_succ += 1;
                let seen = &mut visited[block_index(succ) as usize];
                if !*seen {
                    *seen = true;
                    stack.push((succ, 0));
                }
            }
            None => {
                stack.pop();
                order.push(block);
            }
        }
    }
    order
}

/// Reverse postorder, the canonical iteration order for forward dataflow: a
/// block comes before its successors except on back edges.
pub fn reverse_postorder(body: &Body) -> Vec<BasicBlockId> {
    let mut order = postorder(body);
    order.reverse();
    order
}

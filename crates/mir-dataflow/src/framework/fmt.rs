//! Textual dump of bit-set dataflow results, one comment per line of the
//! pretty-printed body: entry state on block headers, per-location diffs on
//! statements and terminators, exit state on the closing brace.

use mir::pretty::{body_to_string_with, CommentSupplier};
use mir::{BasicBlock, BasicBlockId, Body, Location, Statement, Terminator};
use rustc_hash::FxHashMap;

use crate::framework::bitset::{BitSet, Idx};
use crate::framework::engine::Results;
use crate::framework::visitor::{visit_results, ResultsVisitor};
use crate::framework::{Analysis, AnalysisDomain, Forward};

pub fn dump_dataflow_results<A, I>(body: &Body, results: &mut Results<A>) -> String
where
    A: Analysis + AnalysisDomain<Direction = Forward, Domain = BitSet<I>>,
    I: Idx,
{
    let mut collector = Collector::default();
    let blocks: Vec<BasicBlockId> = body.basic_blocks.iter().map(|(block, _)| block).collect();
    visit_results(body, blocks, results, &mut collector);
    body_to_string_with(body, &mut collector)
}

struct Collector<I> {
    prev: Option<BitSet<I>>,
    block_start: FxHashMap<usize, String>,
    block_end: FxHashMap<usize, String>,
    diffs: FxHashMap<Location, String>,
}

impl<I> Default for Collector<I> {
    fn default() -> Collector<I> {
        Collector {
            prev: None,
            block_start: FxHashMap::default(),
            block_end: FxHashMap::default(),
            diffs: FxHashMap::default(),
        }
    }
}

impl<I: Idx> Collector<I> {
    fn record_diff(&mut self, state: &BitSet<I>, location: Location) {
        if let Some(prev) = &self.prev {
            let diff = format_diff(prev, state);
            if !diff.is_empty() {
                self.diffs.insert(location, diff);
            }
        }
        self.prev = Some(state.clone());
    }
}

impl<I: Idx> ResultsVisitor<BitSet<I>> for Collector<I> {
    fn visit_block_start(&mut self, state: &BitSet<I>, _data: &BasicBlock, block: BasicBlockId) {
        self.block_start.insert(block.index(), format_state(state));
        self.prev = Some(state.clone());
    }

    fn visit_statement_after_primary_effect(
        &mut self,
        state: &BitSet<I>,
        _statement: &Statement,
        location: Location,
    ) {
        self.record_diff(state, location);
    }

    fn visit_terminator_after_primary_effect(
        &mut self,
        state: &BitSet<I>,
        _terminator: &Terminator,
        location: Location,
    ) {
        self.record_diff(state, location);
    }

    fn visit_block_end(&mut self, state: &BitSet<I>, _data: &BasicBlock, block: BasicBlockId) {
        self.block_end.insert(block.index(), format_state(state));
    }
}

impl<I: Idx> CommentSupplier for Collector<I> {
    fn block_start(&mut self, block: BasicBlockId) -> Option<String> {
        self.block_start.get(&block.index()).cloned()
    }

    fn block_end(&mut self, block: BasicBlockId) -> Option<String> {
        self.block_end.get(&block.index()).cloned()
    }

    fn statement(&mut self, location: Location) -> Option<String> {
        self.diffs.get(&location).cloned()
    }

    fn terminator(&mut self, location: Location) -> Option<String> {
        self.diffs.get(&location).cloned()
    }
}

fn format_state<I: Idx>(state: &BitSet<I>) -> String {
    let elems =
        state.iter().map(|elem| format!("_{}", elem.index())).collect::<Vec<_>>().join(", ");
    format!("{{{elems}}}")
}

/// Additions first, then removals: `+_2, -_1`.
fn format_diff<I: Idx>(old: &BitSet<I>, new: &BitSet<I>) -> String {
    let mut parts = Vec::new();
    for elem in new.iter() {
        if !old.contains(elem) {
            parts.push(format!("+_{}", elem.index()));
        }
    }
    for elem in old.iter() {
        if !new.contains(elem) {
            parts.push(format!("-_{}", elem.index()));
        }
    }
    parts.join(", ")
}

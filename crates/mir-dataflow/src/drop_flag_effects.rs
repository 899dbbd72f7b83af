//! Shared translation from move/init events to per-path bit changes, used
//! by the initialization analyses.

use mir::{Body, Location, Place};

use crate::move_paths::{InitKind, LookupResult, MoveData, MovePathIndex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropFlagState {
    /// The path is (maybe) initialized.
    Present,
    /// The path is (maybe) uninitialized.
    Absent,
}

/// Invokes `each_child` on `path` and every path below it.
pub fn on_all_children_bits(
    move_data: &MoveData,
    path: MovePathIndex,
    each_child: &mut impl FnMut(MovePathIndex),
) {
    each_child(path);
    let mut next_child = move_data.move_paths[path].first_child;
    while let Some(child) = next_child {
        on_all_children_bits(move_data, child, each_child);
        next_child = move_data.move_paths[child].next_sibling;
    }
}

/// Like [`on_all_children_bits`] for the result of a place lookup. An
/// inexact lookup (the place lives below a tracked path) touches nothing:
/// writing or moving part of a partly tracked place must not change the
/// state of the whole.
pub fn on_lookup_result_bits(
    move_data: &MoveData,
    lookup_result: LookupResult,
    each_child: &mut impl FnMut(MovePathIndex),
) {
    match lookup_result {
        LookupResult::Exact(path) => on_all_children_bits(move_data, path, each_child),
        LookupResult::Parent(_) => {}
    }
}

/// All drop-flag changes caused by the instruction at `location`:
/// move-outs make paths absent, initializations make them present. Calls'
/// destination writes are excluded here; they happen on the return edge.
pub fn drop_flag_effects_for_location(
    move_data: &MoveData,
    location: Location,
    callback: &mut impl FnMut(MovePathIndex, DropFlagState),
) {
    if let Some(moves) = move_data.loc_map.get(&location) {
        for &move_out in moves {
            let path = move_data.moves[move_out].path;
            on_all_children_bits(move_data, path, &mut |child| {
                callback(child, DropFlagState::Absent)
            });
        }
    }
    for_location_inits(move_data, location, &mut |path| {
        callback(path, DropFlagState::Present)
    });
}

pub fn for_location_inits(
    move_data: &MoveData,
    location: Location,
    callback: &mut impl FnMut(MovePathIndex),
) {
    let Some(inits) = move_data.init_loc_map.get(&location) else { return };
    for &init in inits {
        let init = &move_data.inits[init];
        match init.kind {
            InitKind::Deep => {
                on_all_children_bits(move_data, init.path, callback);
            }
            InitKind::Shallow => callback(init.path),
            InitKind::NonPanicPathOnly => {}
        }
    }
}

/// Function arguments arrive initialized.
pub fn drop_flag_effects_for_function_entry(
    body: &Body,
    move_data: &MoveData,
    callback: &mut impl FnMut(MovePathIndex, DropFlagState),
) {
    for arg in body.args_iter() {
        let lookup = move_data.rev_lookup.find(&Place::from(arg));
        on_lookup_result_bits(move_data, lookup, &mut |path| {
            callback(path, DropFlagState::Present)
        });
    }
}

//! Maybe-uninitialized places: bit `p` is set while move path `p` may lack
//! a value on some path reaching the current location.

use mir::{BasicBlockId, Body, Location, Place, Statement, Terminator};

use crate::drop_flag_effects::{
    drop_flag_effects_for_function_entry, drop_flag_effects_for_location, on_lookup_result_bits,
    DropFlagState,
};
use crate::framework::{AnalysisDomain, BitSet, Forward, GenKill, GenKillAnalysis};
use crate::move_paths::{MoveData, MovePathIndex};

pub struct MaybeUninitializedPlaces<'a> {
    move_data: &'a MoveData,
}

impl<'a> MaybeUninitializedPlaces<'a> {
    pub fn new(move_data: &'a MoveData) -> MaybeUninitializedPlaces<'a> {
        MaybeUninitializedPlaces { move_data }
    }

    pub fn move_data(&self) -> &MoveData {
        self.move_data
    }

    fn update_bits(
        trans: &mut impl GenKill<MovePathIndex>,
        path: MovePathIndex,
        state: DropFlagState,
    ) {
        match state {
            DropFlagState::Absent => trans.gen(path),
            DropFlagState::Present => trans.kill(path),
        }
    }
}

impl AnalysisDomain for MaybeUninitializedPlaces<'_> {
    type Domain = BitSet<MovePathIndex>;
    type Direction = Forward;

    const NAME: &'static str = "maybe_uninit";

    fn bottom_value(&self, _body: &Body) -> Self::Domain {
        // bottom = every path initialized
        BitSet::new_empty(self.move_data.move_paths.len())
    }

    fn initialize_start_block(&self, body: &Body, state: &mut Self::Domain) {
        // Everything starts uninitialized except the arguments.
        state.insert_all();
        drop_flag_effects_for_function_entry(body, self.move_data, &mut |path, drop_state| {
            debug_assert_eq!(drop_state, DropFlagState::Present);
            state.remove(path);
        });
    }
}

impl GenKillAnalysis for MaybeUninitializedPlaces<'_> {
    type Idx = MovePathIndex;

    fn statement_effect(
        &mut self,
        trans: &mut impl GenKill<MovePathIndex>,
        _statement: &Statement,
        location: Location,
    ) {
        drop_flag_effects_for_location(self.move_data, location, &mut |path, drop_state| {
            Self::update_bits(trans, path, drop_state)
        });
    }

    fn terminator_effect(
        &mut self,
        trans: &mut impl GenKill<MovePathIndex>,
        _terminator: &Terminator,
        location: Location,
    ) {
        drop_flag_effects_for_location(self.move_data, location, &mut |path, drop_state| {
            Self::update_bits(trans, path, drop_state)
        });
    }

    fn call_return_effect(
        &mut self,
        trans: &mut impl GenKill<MovePathIndex>,
        _block: BasicBlockId,
        return_place: &Place,
    ) {
        // The destination becomes initialized only once the call returns.
        on_lookup_result_bits(
            self.move_data,
            self.move_data.rev_lookup.find(return_place),
            &mut |path| trans.kill(path),
        );
    }
}

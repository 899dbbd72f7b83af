//! Single-pass construction of [`MoveData`] from a body.

use la_arena::Arena;
use mir::{Body, Location, Operand, Place, PlaceElem, Rvalue, Statement, Terminator};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::framework::bitset::Idx as _;
use crate::move_paths::{
    Init, InitKind, LookupResult, MoveData, MoveOut, MovePath, MovePathIndex, MovePathLookup,
};
use crate::{Cancelled, CancellationToken};

impl MoveData {
    /// Walks the body once, building the path forest and recording every
    /// move-out and initialization with its location.
    pub fn gather_moves(body: &Body, token: &CancellationToken) -> Result<MoveData, Cancelled> {
        let mut builder = MoveDataBuilder::new(body);
        for (block, data) in body.basic_blocks.iter() {
            token.check()?;
            for (statement_index, statement) in data.statements.iter().enumerate() {
                builder.gather_statement(statement, Location { block, statement_index });
            }
            if let Some(terminator) = &data.terminator {
                let location = body.terminator_loc(block);
                builder.gather_terminator(terminator, location);
            }
        }
        Ok(builder.finish())
    }
}

struct MoveDataBuilder<'a> {
    body: &'a Body,
    data: MoveData,
}

impl<'a> MoveDataBuilder<'a> {
    fn new(body: &'a Body) -> MoveDataBuilder<'a> {
        let mut move_paths = Arena::new();
        let mut locals = Vec::with_capacity(body.locals.len());
        for (local, _) in body.locals.iter() {
            let path = move_paths.alloc(MovePath {
                next_sibling: None,
                first_child: None,
                parent: None,
                place: Place::from(local),
            });
            locals.push(path);
        }
        MoveDataBuilder {
            body,
            data: MoveData {
                move_paths,
                moves: Arena::new(),
                loc_map: FxHashMap::default(),
                inits: Arena::new(),
                init_loc_map: FxHashMap::default(),
                rev_lookup: MovePathLookup { locals, projections: FxHashMap::default() },
            },
        }
    }

    fn finish(self) -> MoveData {
        debug!(
            body = %self.body.name,
            paths = self.data.move_paths.len(),
            moves = self.data.moves.len(),
            inits = self.data.inits.len(),
            "gathered moves"
        );
        self.data
    }

    fn gather_statement(&mut self, statement: &Statement, location: Location) {
        match statement {
            Statement::Assign(place, rvalue) => {
                self.create_move_path(place);
                self.gather_init(place, location, InitKind::Deep);
                self.gather_rvalue(rvalue, location);
            }
            // Storage going away moves whatever is left in the local out.
            Statement::StorageDead(local) => {
                self.gather_move(&Place::from(*local), location);
            }
            Statement::StorageLive(_) | Statement::FakeRead(..) | Statement::Nop => {}
        }
    }

    fn gather_rvalue(&mut self, rvalue: &Rvalue, location: Location) {
        match rvalue {
            Rvalue::Use(operand)
            | Rvalue::Repeat(operand, _)
            | Rvalue::Cast(operand, _)
            | Rvalue::UnaryOp(_, operand) => self.gather_operand(operand, location),
            Rvalue::BinaryOp(_, lhs, rhs) | Rvalue::CheckedBinaryOp(_, lhs, rhs) => {
                self.gather_operand(lhs, location);
                self.gather_operand(rhs, location);
            }
            Rvalue::Aggregate(_, operands) => {
                for operand in operands {
                    self.gather_operand(operand, location);
                }
            }
            // Borrowing and inspecting a place moves nothing.
            Rvalue::Ref(..) | Rvalue::Len(_) | Rvalue::Discriminant(_) => {}
        }
    }

    fn gather_terminator(&mut self, terminator: &Terminator, location: Location) {
        match terminator {
            Terminator::SwitchInt { discr, .. } => self.gather_operand(discr, location),
            Terminator::Call { func, args, destination, .. } => {
                self.gather_operand(func, location);
                for arg in args {
                    self.gather_operand(arg, location);
                }
                self.create_move_path(destination);
                // The destination is written on the return edge only; the
                // dataflow applies this init there, not at the terminator.
                self.gather_init(destination, location, InitKind::NonPanicPathOnly);
            }
            Terminator::Drop { place, .. } => self.gather_move(place, location),
            Terminator::Assert { cond, .. } => self.gather_operand(cond, location),
            Terminator::Goto { .. }
            | Terminator::Return
            | Terminator::Resume
            | Terminator::Unreachable
            | Terminator::FalseEdge { .. }
            | Terminator::FalseUnwind { .. } => {}
        }
    }

    fn gather_operand(&mut self, operand: &Operand, location: Location) {
        match operand {
            Operand::Move(place) => self.gather_move(place, location),
            Operand::Copy(_) | Operand::Constant(_) => {}
        }
    }

    fn gather_move(&mut self, place: &Place, location: Location) {
        // A move out of an untracked place (behind a deref or index) leaves
        // no mark; the borrow checker reports those separately.
        let Some(path) = self.move_path_for(place) else { return };
        let move_out = self.data.moves.alloc(MoveOut { path, source: location });
        self.data.loc_map.entry(location).or_insert_with(SmallVec::new).push(move_out);
    }

    fn gather_init(&mut self, place: &Place, location: Location, kind: InitKind) {
        let LookupResult::Exact(path) = self.data.rev_lookup.find(place) else { return };
        let init = self.data.inits.alloc(Init { path, location, kind });
        self.data.init_loc_map.entry(location).or_insert_with(SmallVec::new).push(init);
    }

    fn create_move_path(&mut self, place: &Place) {
        // Extends the forest with the place's tracked prefix so later moves
        // and inits of siblings resolve exactly.
        self.move_path_for(place);
    }

    /// Returns the path for `place`, materializing the spine of field
    /// projections on the way; `None` if the place is untracked.
    fn move_path_for(&mut self, place: &Place) -> Option<MovePathIndex> {
        let mut base = self.data.rev_lookup.locals[place.local.index()];
        for elem in &place.projection {
            match elem {
                PlaceElem::Field(field, _) => {
                    base = self.add_move_path(base, *field, elem.clone());
                }
                PlaceElem::Deref | PlaceElem::Index(_) => return None,
            }
        }
        Some(base)
    }

    fn add_move_path(
        &mut self,
        parent: MovePathIndex,
        field: u32,
        elem: PlaceElem,
    ) -> MovePathIndex {
        if let Some(&path) = self.data.rev_lookup.projections.get(&(parent, field)) {
            return path;
        }
        let mut place = self.data.move_paths[parent].place.clone();
        place.projection.push(elem);
        let path = self.data.move_paths.alloc(MovePath {
            next_sibling: self.data.move_paths[parent].first_child,
            first_child: None,
            parent: Some(parent),
            place,
        });
        self.data.move_paths[parent].first_child = Some(path);
        self.data.rev_lookup.projections.insert((parent, field), path);
        path
    }
}

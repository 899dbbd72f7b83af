//! A read-only body visitor. Every `visit_*` method has a `super_*`
//! counterpart that drives the traversal; overrides call `super_*` to keep
//! descending.

use crate::{
    BasicBlock, BasicBlockId, Body, LocalId, Location, Operand, Place, Rvalue, Statement,
    Terminator,
};

pub trait Visitor {
    fn visit_body(&mut self, body: &Body) {
        self.super_body(body);
    }

    fn visit_basic_block(&mut self, block: BasicBlockId, data: &BasicBlock) {
        self.super_basic_block(block, data);
    }

    fn visit_statement(&mut self, statement: &Statement, location: Location) {
        self.super_statement(statement, location);
    }

    fn visit_assign(&mut self, place: &Place, rvalue: &Rvalue, location: Location) {
        self.super_assign(place, rvalue, location);
    }

    fn visit_terminator(&mut self, terminator: &Terminator, location: Location) {
        self.super_terminator(terminator, location);
    }

    fn visit_rvalue(&mut self, rvalue: &Rvalue, location: Location) {
        self.super_rvalue(rvalue, location);
    }

    fn visit_operand(&mut self, operand: &Operand, location: Location) {
        self.super_operand(operand, location);
    }

    fn visit_place(&mut self, _place: &Place, _location: Location) {}

    fn visit_local(&mut self, _local: LocalId, _location: Location) {}

    fn super_body(&mut self, body: &Body) {
        for (block, data) in body.basic_blocks.iter() {
            self.visit_basic_block(block, data);
        }
    }

    fn super_basic_block(&mut self, block: BasicBlockId, data: &BasicBlock) {
        for (statement_index, statement) in data.statements.iter().enumerate() {
            self.visit_statement(statement, Location { block, statement_index });
        }
        if let Some(terminator) = &data.terminator {
            let location = Location { block, statement_index: data.statements.len() };
            self.visit_terminator(terminator, location);
        }
    }

    fn super_statement(&mut self, statement: &Statement, location: Location) {
        match statement {
            Statement::Assign(place, rvalue) => self.visit_assign(place, rvalue, location),
            Statement::StorageLive(local) | Statement::StorageDead(local) => {
                self.visit_local(*local, location);
            }
            Statement::FakeRead(_, place) => self.visit_place(place, location),
            Statement::Nop => {}
        }
    }

    fn super_assign(&mut self, place: &Place, rvalue: &Rvalue, location: Location) {
        self.visit_place(place, location);
        self.visit_rvalue(rvalue, location);
    }

    fn super_terminator(&mut self, terminator: &Terminator, location: Location) {
        match terminator {
            Terminator::SwitchInt { discr, .. } => self.visit_operand(discr, location),
            Terminator::Call { func, args, destination, .. } => {
                self.visit_operand(func, location);
                for arg in args {
                    self.visit_operand(arg, location);
                }
                self.visit_place(destination, location);
            }
            Terminator::Drop { place, .. } => self.visit_place(place, location),
            Terminator::Assert { cond, .. } => self.visit_operand(cond, location),
            Terminator::Goto { .. }
            | Terminator::Return
            | Terminator::Resume
            | Terminator::Unreachable
            | Terminator::FalseEdge { .. }
            | Terminator::FalseUnwind { .. } => {}
        }
    }

    fn super_rvalue(&mut self, rvalue: &Rvalue, location: Location) {
        match rvalue {
            Rvalue::Use(operand)
            | Rvalue::Repeat(operand, _)
            | Rvalue::Cast(operand, _)
            | Rvalue::UnaryOp(_, operand) => self.visit_operand(operand, location),
            Rvalue::Ref(_, place)
            | Rvalue::Len(place)
            | Rvalue::Discriminant(place) => self.visit_place(place, location),
            Rvalue::BinaryOp(_, lhs, rhs) | Rvalue::CheckedBinaryOp(_, lhs, rhs) => {
                self.visit_operand(lhs, location);
                self.visit_operand(rhs, location);
            }
            Rvalue::Aggregate(_, operands) => {
                for operand in operands {
                    self.visit_operand(operand, location);
                }
            }
        }
    }

    fn super_operand(&mut self, operand: &Operand, location: Location) {
        match operand {
            Operand::Copy(place) | Operand::Move(place) => self.visit_place(place, location),
            Operand::Constant(_) => {}
        }
    }
}

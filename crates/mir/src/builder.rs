//! Two-phase construction of a [`Body`].
//!
//! Blocks and locals are allocated first, then filled with statements and
//! terminated. `finish` checks the structural invariants so that the
//! analyses never see a half-built graph.

use la_arena::Arena;
use tracing::debug;

use crate::ty::Ty;
use crate::{
    BasicBlock, BasicBlockId, Body, Local, LocalId, LocalInfo, Mutability, Place, Rvalue,
    Statement, Terminator,
};

pub struct BodyBuilder {
    name: String,
    basic_blocks: Arena<BasicBlock>,
    locals: Arena<Local>,
    arg_count: usize,
}

impl BodyBuilder {
    /// Starts a body whose first `arg_count` locals after the return place
    /// are arguments. The return place and the argument locals must be
    /// allocated, in order, before any other local.
    pub fn new(name: &str, arg_count: usize) -> BodyBuilder {
        BodyBuilder {
            name: name.to_owned(),
            basic_blocks: Arena::new(),
            locals: Arena::new(),
            arg_count,
        }
    }

    pub fn local(&mut self, ty: Ty, mutability: Mutability) -> LocalId {
        self.locals.alloc(Local::new(ty, mutability))
    }

    pub fn static_ref_local(&mut self, ty: Ty, is_thread_local: bool) -> LocalId {
        self.locals.alloc(Local {
            ty,
            mutability: Mutability::Not,
            info: LocalInfo::StaticRef { is_thread_local },
        })
    }

    pub fn new_block(&mut self) -> BasicBlockId {
        self.basic_blocks.alloc(BasicBlock::default())
    }

    pub fn new_cleanup_block(&mut self) -> BasicBlockId {
        self.basic_blocks.alloc(BasicBlock { is_cleanup: true, ..BasicBlock::default() })
    }

    pub fn push(&mut self, block: BasicBlockId, statement: Statement) {
        assert!(
            self.basic_blocks[block].terminator.is_none(),
            "pushing a statement into a terminated block"
        );
        self.basic_blocks[block].statements.push(statement);
    }

    pub fn push_assign(&mut self, block: BasicBlockId, place: Place, rvalue: Rvalue) {
        self.push(block, Statement::Assign(place, rvalue));
    }

    /// Sets the block's terminator. A block can be terminated only once.
    pub fn terminate(&mut self, block: BasicBlockId, terminator: Terminator) {
        let slot = &mut self.basic_blocks[block].terminator;
        assert!(slot.is_none(), "block terminated twice");
        *slot = Some(terminator);
    }

    /// Retrofits an unwind edge onto an already placed terminator. Panics if
    /// the terminator kind has no unwind edge.
    pub fn set_unwind(&mut self, block: BasicBlockId, to: BasicBlockId) {
        let terminator = self.basic_blocks[block]
            .terminator
            .as_mut()
            .unwrap_or_else(|| panic!("set_unwind on an unterminated block"));
        match terminator.unwind_mut() {
            Some(unwind) => *unwind = Some(to),
            None => panic!("terminator `{terminator:?}` has no unwind edge"),
        }
    }

    pub fn finish(self) -> Body {
        assert!(!self.locals.is_empty(), "body without a return place");
        assert!(
            self.locals.len() > self.arg_count,
            "fewer locals than declared arguments"
        );
        for (block, data) in self.basic_blocks.iter() {
            assert!(
                data.terminator.is_some(),
                "bb{} has no terminator",
                crate::block_index(block)
            );
        }
        debug!(
            name = %self.name,
            blocks = self.basic_blocks.len(),
            locals = self.locals.len(),
            "built mir body"
        );
        Body::new(self.name, self.basic_blocks, self.locals, self.arg_count)
    }
}

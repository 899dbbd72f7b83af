//! A mid-level IR for function bodies: a control-flow graph of basic blocks
//! over a flat list of locals.
//!
//! A [`Body`] is immutable once built. Construction goes through
//! [`builder::BodyBuilder`], which enforces the invariants the analyses rely
//! on: exactly one terminator per block, local `_0` is the return place and
//! locals `_1..=_arg_count` are the arguments.

pub mod builder;
pub mod pretty;
pub mod traversal;
pub mod ty;
pub mod visit;

use std::sync::OnceLock;

use la_arena::{Arena, Idx, RawIdx};
use smallvec::{smallvec, SmallVec};

pub use crate::builder::BodyBuilder;
pub use crate::ty::Ty;

pub type LocalId = Idx<Local>;
pub type BasicBlockId = Idx<BasicBlock>;

/// The block every body starts executing from.
pub fn start_block() -> BasicBlockId {
    BasicBlockId::from_raw(RawIdx::from(0))
}

/// The local holding the return value.
pub fn return_place() -> LocalId {
    LocalId::from_raw(RawIdx::from(0))
}

pub(crate) fn local_index(local: LocalId) -> u32 {
    u32::from(local.into_raw())
}

pub(crate) fn block_index(block: BasicBlockId) -> u32 {
    u32::from(block.into_raw())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutability {
    Not,
    Mut,
}

/// Where a local came from, as far as the analyses care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalInfo {
    /// An ordinary user variable or temporary.
    Other,
    /// A reference to a `static`. Borrows held in such locals outlive the
    /// body, and thread-local statics are the one kind of static whose
    /// borrows still expire.
    StaticRef { is_thread_local: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    pub ty: Ty,
    pub mutability: Mutability,
    pub info: LocalInfo,
}

impl Local {
    pub fn new(ty: Ty, mutability: Mutability) -> Local {
        Local { ty, mutability, info: LocalInfo::Other }
    }

    pub fn is_ref_to_static(&self) -> bool {
        matches!(self.info, LocalInfo::StaticRef { .. })
    }

    pub fn is_ref_to_thread_local(&self) -> bool {
        matches!(self.info, LocalInfo::StaticRef { is_thread_local: true })
    }
}

/// A path into memory: a local plus a (possibly empty) chain of projections.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Place {
    pub local: LocalId,
    pub projection: SmallVec<[PlaceElem; 2]>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaceElem {
    Deref,
    /// Field access; carries the field's type so place types can be computed
    /// without a type context.
    Field(u32, Ty),
    Index(LocalId),
}

impl Place {
    pub fn field(mut self, field: u32, ty: Ty) -> Place {
        self.projection.push(PlaceElem::Field(field, ty));
        self
    }

    pub fn deref(mut self) -> Place {
        self.projection.push(PlaceElem::Deref);
        self
    }

    pub fn index(mut self, index: LocalId) -> Place {
        self.projection.push(PlaceElem::Index(index));
        self
    }

    /// The type of the place obtained by applying the first `depth`
    /// projections to the base local.
    ///
    /// Panics on a projection the base type does not support; the translator
    /// is trusted to produce well-typed places.
    pub fn ty_before(&self, body: &Body, depth: usize) -> Ty {
        let mut ty = body.locals[self.local].ty.clone();
        for elem in &self.projection[..depth] {
            ty = match elem {
                PlaceElem::Deref => match ty.builtin_deref() {
                    Some(pointee) => pointee.clone(),
                    None => panic!("deref of non-pointer type `{ty}`"),
                },
                PlaceElem::Field(_, field_ty) => field_ty.clone(),
                PlaceElem::Index(_) => match &ty {
                    Ty::Array(element, _) | Ty::Slice(element) => (**element).clone(),
                    _ => panic!("index into non-array type `{ty}`"),
                },
            };
        }
        ty
    }

    pub fn ty(&self, body: &Body) -> Ty {
        self.ty_before(body, self.projection.len())
    }
}

impl From<LocalId> for Place {
    fn from(local: LocalId) -> Place {
        Place { local, projection: SmallVec::new() }
    }
}

/// A position inside a body: `statement_index` in `0..statements.len()`
/// addresses a statement, `statements.len()` addresses the terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub block: BasicBlockId,
    pub statement_index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BorrowKind {
    Shared,
    /// A shallow borrow as used for matched places; covers only the base
    /// memory of the place, not anything reached through it.
    Shallow,
    Mut { allow_two_phase_borrow: bool },
}

impl BorrowKind {
    pub fn allows_two_phase_borrow(self) -> bool {
        matches!(self, BorrowKind::Mut { allow_two_phase_borrow: true })
    }

    pub fn mutability(self) -> Mutability {
        match self {
            BorrowKind::Shared | BorrowKind::Shallow => Mutability::Not,
            BorrowKind::Mut { .. } => Mutability::Mut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FakeReadCause {
    ForLet,
    ForMatchedPlace,
    ForIndex,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Assign(Place, Rvalue),
    StorageLive(LocalId),
    StorageDead(LocalId),
    /// A read inserted for diagnostics only; never moves.
    FakeRead(FakeReadCause, Place),
    Nop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Copy(Place),
    Move(Place),
    Constant(Constant),
}

impl Operand {
    pub fn place(&self) -> Option<&Place> {
        match self {
            Operand::Copy(place) | Operand::Move(place) => Some(place),
            Operand::Constant(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Constant {
    pub ty: Ty,
    pub value: ConstValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstValue {
    Scalar(i128),
    ZeroSized,
}

impl Constant {
    pub fn scalar(ty: Ty, value: i128) -> Constant {
        Constant { ty, value: ConstValue::Scalar(value) }
    }

    pub fn zero_sized(ty: Ty) -> Constant {
        Constant { ty, value: ConstValue::ZeroSized }
    }

    pub fn unit() -> Constant {
        Constant::zero_sized(Ty::Unit)
    }

    pub fn bool(value: bool) -> Constant {
        Constant::scalar(Ty::Bool, value as i128)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitXor,
    BitAnd,
    BitOr,
    Shl,
    Shr,
    Eq,
    Lt,
    Le,
    Ne,
    Ge,
    Gt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateKind {
    Tuple,
    Adt(Ty),
    Array(Ty),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rvalue {
    Use(Operand),
    Repeat(Operand, u64),
    Ref(BorrowKind, Place),
    Len(Place),
    Cast(Operand, Ty),
    BinaryOp(BinOp, Operand, Operand),
    CheckedBinaryOp(BinOp, Operand, Operand),
    UnaryOp(UnOp, Operand),
    Discriminant(Place),
    Aggregate(AggregateKind, Vec<Operand>),
}

/// Branch targets of a `SwitchInt`: `targets` is one edge per entry of
/// `values` plus the mandatory "otherwise" edge last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchTargets {
    values: Vec<u128>,
    targets: Vec<BasicBlockId>,
}

impl SwitchTargets {
    pub fn new(values: Vec<u128>, targets: Vec<BasicBlockId>) -> SwitchTargets {
        assert_eq!(values.len() + 1, targets.len(), "switch needs an otherwise edge");
        SwitchTargets { values, targets }
    }

    /// Two-way switch: `value` goes to `then_target`, everything else to
    /// `otherwise`.
    pub fn static_if(value: u128, then_target: BasicBlockId, otherwise: BasicBlockId) -> SwitchTargets {
        SwitchTargets::new(vec![value], vec![then_target, otherwise])
    }

    pub fn iter(&self) -> impl Iterator<Item = (u128, BasicBlockId)> + '_ {
        self.values.iter().copied().zip(self.targets.iter().copied())
    }

    pub fn otherwise(&self) -> BasicBlockId {
        self.targets[self.targets.len() - 1]
    }

    pub fn all_targets(&self) -> &[BasicBlockId] {
        &self.targets
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Terminator {
    Goto {
        target: BasicBlockId,
    },
    SwitchInt {
        discr: Operand,
        targets: SwitchTargets,
    },
    Return,
    Resume,
    Unreachable,
    Call {
        func: Operand,
        args: Vec<Operand>,
        destination: Place,
        target: Option<BasicBlockId>,
        unwind: Option<BasicBlockId>,
    },
    Drop {
        place: Place,
        target: BasicBlockId,
        unwind: Option<BasicBlockId>,
    },
    Assert {
        cond: Operand,
        expected: bool,
        target: BasicBlockId,
        unwind: Option<BasicBlockId>,
    },
    /// Keeps an edge the CFG needs for borrowck even though execution always
    /// takes `real_target`.
    FalseEdge {
        real_target: BasicBlockId,
        imaginary_target: BasicBlockId,
    },
    FalseUnwind {
        real_target: BasicBlockId,
        unwind: Option<BasicBlockId>,
    },
}

impl Terminator {
    pub fn successors(&self) -> SmallVec<[BasicBlockId; 2]> {
        match self {
            Terminator::Goto { target } => smallvec![*target],
            Terminator::SwitchInt { targets, .. } => targets.targets.iter().copied().collect(),
            Terminator::Return | Terminator::Resume | Terminator::Unreachable => SmallVec::new(),
            Terminator::Call { target, unwind, .. } => {
                target.iter().chain(unwind.iter()).copied().collect()
            }
            Terminator::Drop { target, unwind, .. }
            | Terminator::Assert { target, unwind, .. } => {
                Some(target).into_iter().chain(unwind.iter()).copied().collect()
            }
            Terminator::FalseEdge { real_target, imaginary_target } => {
                smallvec![*real_target, *imaginary_target]
            }
            Terminator::FalseUnwind { real_target, unwind } => {
                Some(real_target).into_iter().chain(unwind.iter()).copied().collect()
            }
        }
    }

    pub fn unwind_mut(&mut self) -> Option<&mut Option<BasicBlockId>> {
        match self {
            Terminator::Call { unwind, .. }
            | Terminator::Drop { unwind, .. }
            | Terminator::Assert { unwind, .. }
            | Terminator::FalseUnwind { unwind, .. } => Some(unwind),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BasicBlock {
    pub statements: Vec<Statement>,
    pub terminator: Option<Terminator>,
    pub is_cleanup: bool,
}

impl BasicBlock {
    /// The block's terminator. Every block of a finished body has one.
    pub fn terminator(&self) -> &Terminator {
        match &self.terminator {
            Some(terminator) => terminator,
            None => panic!("basic block without terminator"),
        }
    }
}

#[derive(Debug)]
pub struct Body {
    pub basic_blocks: Arena<BasicBlock>,
    pub locals: Arena<Local>,
    /// Locals `1..=arg_count` are the function's arguments.
    pub arg_count: usize,
    pub name: String,
    predecessor_cache: OnceLock<Vec<SmallVec<[BasicBlockId; 2]>>>,
}

impl Body {
    pub(crate) fn new(
        name: String,
        basic_blocks: Arena<BasicBlock>,
        locals: Arena<Local>,
        arg_count: usize,
    ) -> Body {
        Body { basic_blocks, locals, arg_count, name, predecessor_cache: OnceLock::new() }
    }

    pub fn start_block(&self) -> BasicBlockId {
        start_block()
    }

    /// Locals `_1..=_arg_count`.
    pub fn args_iter(&self) -> impl Iterator<Item = LocalId> + '_ {
        (1..=self.arg_count as u32).map(|raw| LocalId::from_raw(RawIdx::from(raw)))
    }

    /// All locals that are not arguments and not the return place.
    pub fn vars_and_temps_iter(&self) -> impl Iterator<Item = LocalId> + '_ {
        (self.arg_count as u32 + 1..self.locals.len() as u32)
            .map(|raw| LocalId::from_raw(RawIdx::from(raw)))
    }

    pub fn terminator_loc(&self, block: BasicBlockId) -> Location {
        Location { block, statement_index: self.basic_blocks[block].statements.len() }
    }

    /// Predecessor edges, indexed by the raw block index. Computed once on
    /// first use.
    pub fn predecessors(&self) -> &[SmallVec<[BasicBlockId; 2]>] {
        self.predecessor_cache.get_or_init(|| {
            let mut preds = vec![SmallVec::new(); self.basic_blocks.len()];
            for (block, data) in self.basic_blocks.iter() {
                if let Some(terminator) = &data.terminator {
                    for succ in terminator.successors() {
                        preds[block_index(succ) as usize].push(block);
                    }
                }
            }
            preds
        })
    }
}

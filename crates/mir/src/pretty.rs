//! Human-readable rendering of a [`Body`].
//!
//! The output mirrors the usual textual MIR shape. A [`CommentSupplier`]
//! can attach end-of-line comments to block headers, statements, terminators
//! and block footers; the dataflow test harness uses this to render the
//! analysis state inline.

use std::fmt;

use crate::ty::Ty;
use crate::{
    block_index, local_index, AggregateKind, BasicBlockId, Body, BorrowKind, ConstValue, Constant,
    Local, LocalId, Location, Mutability, Operand, Place, PlaceElem, Rvalue, Statement,
    Terminator,
};

const INDENT: &str = "    ";
/// Column where end-of-line comments start.
const ALIGN: usize = 40;

pub trait CommentSupplier {
    fn block_start(&mut self, _block: BasicBlockId) -> Option<String> {
        None
    }
    fn block_end(&mut self, _block: BasicBlockId) -> Option<String> {
        None
    }
    fn statement(&mut self, _location: Location) -> Option<String> {
        None
    }
    fn terminator(&mut self, _location: Location) -> Option<String> {
        None
    }
}

pub struct NoComments;

impl CommentSupplier for NoComments {}

pub fn body_to_string(body: &Body) -> String {
    body_to_string_with(body, &mut NoComments)
}

pub fn body_to_string_with(body: &Body, comments: &mut dyn CommentSupplier) -> String {
    let mut out = String::new();
    print_signature(body, &mut out);
    print_local_decls(body, &mut out);
    for (block, _) in body.basic_blocks.iter() {
        out.push('\n');
        print_block(body, block, comments, &mut out);
    }
    out.push_str("}\n");
    out
}

fn print_signature(body: &Body, out: &mut String) {
    let args = body
        .args_iter()
        .map(|arg| format!("_{}: {}", local_index(arg), body.locals[arg].ty))
        .collect::<Vec<_>>()
        .join(", ");
    let ret_ty = &body.locals[crate::return_place()].ty;
    out.push_str(&format!("fn {}({}) -> {} {{\n", body.name, args, ret_ty));
}

fn print_local_decls(body: &Body, out: &mut String) {
    let mut decl = |local: LocalId, data: &Local| {
        let mutability = match data.mutability {
            Mutability::Mut => "mut ",
            Mutability::Not => "",
        };
        out.push_str(&format!(
            "{INDENT}let {}_{}: {};\n",
            mutability,
            local_index(local),
            data.ty
        ));
    };
    let ret = crate::return_place();
    decl(ret, &body.locals[ret]);
    for local in body.vars_and_temps_iter() {
        decl(local, &body.locals[local]);
    }
}

fn print_block(
    body: &Body,
    block: BasicBlockId,
    comments: &mut dyn CommentSupplier,
    out: &mut String,
) {
    let data = &body.basic_blocks[block];
    let cleanup = if data.is_cleanup { " (cleanup)" } else { "" };
    let header = format!("{INDENT}bb{}{}: {{", block_index(block), cleanup);
    push_line(out, header, comments.block_start(block));

    for (statement_index, statement) in data.statements.iter().enumerate() {
        let location = Location { block, statement_index };
        let line = format!("{INDENT}{INDENT}{}", statement_to_string(statement));
        push_line(out, line, comments.statement(location));
    }

    let location = body.terminator_loc(block);
    let line = format!("{INDENT}{INDENT}{}", terminator_to_string(data.terminator()));
    push_line(out, line, comments.terminator(location));

    push_line(out, format!("{INDENT}}}"), comments.block_end(block));
}

fn push_line(out: &mut String, line: String, comment: Option<String>) {
    out.push_str(&line);
    if let Some(comment) = comment {
        for _ in line.len()..ALIGN {
            out.push(' ');
        }
        out.push_str(" // ");
        out.push_str(&comment);
    }
    out.push('\n');
}

fn statement_to_string(statement: &Statement) -> String {
    match statement {
        Statement::Assign(place, rvalue) => format!("{place} = {rvalue};"),
        Statement::StorageLive(local) => format!("StorageLive(_{});", local_index(*local)),
        Statement::StorageDead(local) => format!("StorageDead(_{});", local_index(*local)),
        Statement::FakeRead(cause, place) => format!("FakeRead({cause:?}, {place});"),
        Statement::Nop => "nop;".to_owned(),
    }
}

fn terminator_to_string(terminator: &Terminator) -> String {
    let (head, edges) = terminator_head_and_edges(terminator);
    match edges.len() {
        0 => format!("{head};"),
        1 => format!("{head} -> bb{};", block_index(edges[0].1)),
        _ => {
            let labels = edges
                .iter()
                .map(|(label, target)| format!("{label}: bb{}", block_index(*target)))
                .collect::<Vec<_>>()
                .join(", ");
            format!("{head} -> [{labels}];")
        }
    }
}

fn terminator_head_and_edges(terminator: &Terminator) -> (String, Vec<(String, BasicBlockId)>) {
    let mut edges = Vec::new();
    let head = match terminator {
        Terminator::Goto { target } => {
            edges.push((String::new(), *target));
            "goto".to_owned()
        }
        Terminator::SwitchInt { discr, targets } => {
            for (value, target) in targets.iter() {
                edges.push((value.to_string(), target));
            }
            edges.push(("otherwise".to_owned(), targets.otherwise()));
            format!("switchInt({discr})")
        }
        Terminator::Return => "return".to_owned(),
        Terminator::Resume => "resume".to_owned(),
        Terminator::Unreachable => "unreachable".to_owned(),
        Terminator::Call { func, args, destination, target, unwind } => {
            if let Some(target) = target {
                edges.push(("return".to_owned(), *target));
            }
            if let Some(unwind) = unwind {
                edges.push(("unwind".to_owned(), *unwind));
            }
            let args =
                args.iter().map(|arg| arg.to_string()).collect::<Vec<_>>().join(", ");
            format!("{destination} = {}({args})", callee_to_string(func))
        }
        Terminator::Drop { place, target, unwind } => {
            edges.push(("return".to_owned(), *target));
            if let Some(unwind) = unwind {
                edges.push(("unwind".to_owned(), *unwind));
            }
            format!("drop({place})")
        }
        Terminator::Assert { cond, expected, target, unwind } => {
            edges.push(("success".to_owned(), *target));
            if let Some(unwind) = unwind {
                edges.push(("unwind".to_owned(), *unwind));
            }
            let negation = if *expected { "" } else { "!" };
            format!("assert({negation}{cond})")
        }
        Terminator::FalseEdge { real_target, imaginary_target } => {
            edges.push(("real".to_owned(), *real_target));
            edges.push(("imaginary".to_owned(), *imaginary_target));
            "falseEdge".to_owned()
        }
        Terminator::FalseUnwind { real_target, unwind } => {
            edges.push(("real".to_owned(), *real_target));
            if let Some(unwind) = unwind {
                edges.push(("unwind".to_owned(), *unwind));
            }
            "falseUnwind".to_owned()
        }
    };
    (head, edges)
}

/// Call terminators print a bare path for direct calls.
fn callee_to_string(func: &Operand) -> String {
    match func {
        Operand::Constant(Constant { ty: Ty::FnDef(name), .. }) => name.to_string(),
        other => other.to_string(),
    }
}

impl fmt::Display for Place {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut repr = format!("_{}", local_index(self.local));
        for elem in &self.projection {
            repr = match elem {
                PlaceElem::Deref => format!("(*{repr})"),
                PlaceElem::Field(field, ty) => format!("({repr}.{field}: {ty})"),
                PlaceElem::Index(local) => format!("{repr}[_{}]", local_index(*local)),
            };
        }
        f.write_str(&repr)
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Copy(place) => write!(f, "{place}"),
            Operand::Move(place) => write!(f, "move {place}"),
            Operand::Constant(constant) => write!(f, "{constant}"),
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.value, &self.ty) {
            (ConstValue::Scalar(value), Ty::Bool) => {
                write!(f, "const {}", *value != 0)
            }
            (ConstValue::Scalar(value), Ty::Int(int_ty)) => {
                write!(f, "const {}_{}", value, int_ty.name())
            }
            (ConstValue::Scalar(value), _) => write!(f, "const {value}"),
            (ConstValue::ZeroSized, Ty::Unit) => write!(f, "const ()"),
            (ConstValue::ZeroSized, Ty::FnDef(name)) => write!(f, "{name}"),
            (ConstValue::ZeroSized, ty) => write!(f, "{ty}"),
        }
    }
}

impl fmt::Display for Rvalue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rvalue::Use(operand) => write!(f, "{operand}"),
            Rvalue::Repeat(operand, count) => write!(f, "[{operand}; {count}]"),
            Rvalue::Ref(BorrowKind::Shared, place) => write!(f, "&{place}"),
            Rvalue::Ref(BorrowKind::Shallow, place) => write!(f, "&shallow {place}"),
            Rvalue::Ref(BorrowKind::Mut { .. }, place) => write!(f, "&mut {place}"),
            Rvalue::Len(place) => write!(f, "Len({place})"),
            Rvalue::Cast(operand, ty) => write!(f, "{operand} as {ty}"),
            Rvalue::BinaryOp(op, lhs, rhs) => write!(f, "{op:?}({lhs}, {rhs})"),
            Rvalue::CheckedBinaryOp(op, lhs, rhs) => write!(f, "Checked{op:?}({lhs}, {rhs})"),
            Rvalue::UnaryOp(op, operand) => write!(f, "{op:?}({operand})"),
            Rvalue::Discriminant(place) => write!(f, "discriminant({place})"),
            Rvalue::Aggregate(kind, operands) => {
                let operands =
                    operands.iter().map(|op| op.to_string()).collect::<Vec<_>>();
                match kind {
                    AggregateKind::Tuple if operands.len() == 1 => {
                        write!(f, "({},)", operands[0])
                    }
                    AggregateKind::Tuple => write!(f, "({})", operands.join(", ")),
                    AggregateKind::Adt(ty) if operands.is_empty() => write!(f, "{ty}"),
                    AggregateKind::Adt(ty) => write!(f, "{ty}({})", operands.join(", ")),
                    AggregateKind::Array(_) => write!(f, "[{}]", operands.join(", ")),
                }
            }
        }
    }
}
